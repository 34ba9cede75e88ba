//! Demonstrates plugging a custom HTTP transport and error mapper into the client.
//!
//! 1. Implement [`ApiHttpClient`] and hand out an [`AsyncHttpClient`] handle per request.
//! 2. Provide a [`TransportErrorMapper`] that understands the transport's error type.
//! 3. Pass both to [`AuthenticatedClient::with_http_client`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::Result;
// self
use guardian_client::{
	api::TakerIdx,
	auth::CredentialPair,
	client::AuthenticatedClient,
	error::{Error, TransportError},
	http::ApiHttpClient,
	obs::CallKind,
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	service::ServiceDescriptor,
	session::Session,
	store::{MemoryStore, SessionStore},
	transport::TransportErrorMapper,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let session = Arc::new(Session::new(store));

	session.sign_in(CredentialPair::new("offline-access", "offline-refresh")).await?;

	let service = ServiceDescriptor::builder().base_url_str("https://backend.example.com")?.build()?;
	let mapper = Arc::new(OfflineErrorMapper);
	let client: AuthenticatedClient<OfflineHttpClient, OfflineErrorMapper> =
		AuthenticatedClient::with_http_client(
			Arc::clone(&session),
			service.clone(),
			Arc::new(OfflineHttpClient::default()),
			Arc::clone(&mapper),
		);
	let schedules = client.list_schedules(Some(TakerIdx::new(7)?)).await?;

	println!("Schedules served by the offline transport: {}.", schedules.len());

	let unreachable: AuthenticatedClient<OfflineHttpClient, OfflineErrorMapper> =
		AuthenticatedClient::with_http_client(
			session,
			service,
			Arc::new(OfflineHttpClient::unreachable("backend.example.com")),
			mapper,
		);

	match unreachable.list_takers().await {
		Ok(_) => println!("Offline transport unexpectedly reached the backend."),
		Err(e @ Error::Transport(_)) => println!("Transport failure surfaced unchanged: {e}."),
		Err(e) => println!("Unexpected error: {e}."),
	}

	Ok(())
}

#[derive(Clone, Debug)]
struct HostUnreachable {
	host: &'static str,
}
impl Display for HostUnreachable {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} is unreachable", self.host)
	}
}
impl StdError for HostUnreachable {}

#[derive(Clone, Default)]
struct OfflineHttpClient {
	unreachable: Option<HostUnreachable>,
}
impl OfflineHttpClient {
	fn unreachable(host: &'static str) -> Self {
		Self { unreachable: Some(HostUnreachable { host }) }
	}
}
impl ApiHttpClient for OfflineHttpClient {
	type Handle = OfflineHttpClient;
	type TransportError = HostUnreachable;

	fn handle(&self) -> Self::Handle {
		self.clone()
	}
}
impl<'a> AsyncHttpClient<'a> for OfflineHttpClient {
	type Error = HttpClientError<HostUnreachable>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let unreachable = self.unreachable.clone();

		Box::pin(async move {
			if let Some(error) = unreachable {
				// `HttpClientError::Reqwest` boxes any transport error despite its name.
				return Err(HttpClientError::Reqwest(Box::new(error)));
			}

			println!("{} {}", request.method(), request.uri());

			let mut response = HttpResponse::new(
				br#"{"data":[{"scheduleIdx":1,"takerIdx":7,"title":"Aspirin"}]}"#.to_vec(),
			);

			*response.status_mut() = StatusCode::OK;

			Ok(response)
		})
	}
}

#[derive(Clone, Default)]
struct OfflineErrorMapper;
impl TransportErrorMapper<HostUnreachable> for OfflineErrorMapper {
	fn map_transport_error(&self, call: CallKind, error: HttpClientError<HostUnreachable>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Other(message) =>
				TransportError::Other { message: format!("{call} call failed: {message}") }.into(),
			_ => TransportError::Other { message: format!("{call} call failed") }.into(),
		}
	}
}
