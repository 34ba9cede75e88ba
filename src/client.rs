//! The authenticated client: bearer requests with a single refresh-and-retry cycle.
//!
//! [`AuthenticatedClient`] owns the transport, the transport error mapper, the shared
//! [`Session`], and the backend [`ServiceDescriptor`]. Every authenticated call in the
//! crate goes through [`AuthenticatedClient::request`], so the 401 recovery path lives
//! in exactly one place.

mod metrics;
mod renew;
mod request;

pub use metrics::RenewalMetrics;

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::{ApiHttpClient, ApiRequest, ApiResponse},
	obs::CallKind,
	service::ServiceDescriptor,
	session::Session,
	transport::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, transport::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthenticatedClient =
	AuthenticatedClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Issues backend calls on behalf of a [`Session`].
///
/// Cloning is cheap; clones share the transport, the session, and the renewal metrics.
pub struct AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Session holding the credential pair and the renewal guard.
	pub session: Arc<Session>,
	/// Backend descriptor used to resolve endpoint URLs.
	pub service: ServiceDescriptor,
	/// Shared counters for renewal outcomes.
	pub renewal_metrics: Arc<RenewalMetrics>,
}
impl<C, M> AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		session: Arc<Session>,
		service: ServiceDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			session,
			service,
			renewal_metrics: Default::default(),
		}
	}

	/// Sends `request` without an `Authorization` header and without the 401 recovery path.
	pub async fn send_unauthenticated(&self, request: &ApiRequest) -> Result<ApiResponse> {
		self.dispatch(CallKind::Request, request, None).await
	}

	/// Executes one round trip, presenting `bearer` when provided.
	pub(crate) async fn dispatch(
		&self,
		kind: CallKind,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let http_request = request.to_http(bearer)?;
		let handle = self.http_client.handle();
		let response = handle
			.call(http_request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(kind, err))?;

		Ok(response.into())
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client backed by its own reqwest transport.
	pub fn new(session: Arc<Session>, service: ServiceDescriptor) -> Self {
		Self::with_http_client(
			session,
			service,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
			session: Arc::clone(&self.session),
			service: self.service.clone(),
			renewal_metrics: Arc::clone(&self.renewal_metrics),
		}
	}
}
impl<C, M> Debug for AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("service", &self.service)
			.field("session", &self.session)
			.field("renewal_metrics", &self.renewal_metrics)
			.finish()
	}
}
