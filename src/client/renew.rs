//! Access token renewal with singleflight guards and CAS rotation.
//!
//! Renewal presents the refresh token as a bearer to the renewal endpoint. The
//! response shape varies between backend versions, so extraction walks a fixed
//! priority list: `data.token`, then `data`, then the top level. The first object
//! carrying both tokens wins. Failing that, a bare access token is accepted from the
//! same places (or `data` as a plain string) and the refresh token is retained.

// crates.io
use oauth2::http::{HeaderValue, header::CONTENT_TYPE};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	client::AuthenticatedClient,
	http::{ApiHttpClient, ApiRequest},
	obs::{self, CallKind, CallOutcome, CallSpan, trace_debug, trace_warn},
	service::paths,
	transport::TransportErrorMapper,
};

impl<C, M> AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges `refresh_token` for a new credential pair.
	///
	/// The returned pair keeps `refresh_token` unless the backend issued a different,
	/// non-empty one. Nothing is persisted; see [`AuthenticatedClient::refresh_session`].
	pub async fn refresh(&self, refresh_token: &TokenSecret) -> Result<CredentialPair> {
		const KIND: CallKind = CallKind::Renewal;

		let span = CallSpan::new(KIND, "refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(self.service.endpoint(paths::RENEW))
					.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
				let response = self.dispatch(KIND, &request, Some(refresh_token)).await?;

				if !response.is_success() {
					return Err(Error::AuthExpired {
						reason: format!(
							"renewal endpoint returned HTTP {}",
							response.status.as_u16()
						),
					});
				}

				Ok(extract_credentials(&response.body)?.into_pair(refresh_token))
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Renews the session's pair now and persists the result.
	pub async fn refresh_session(&self) -> Result<CredentialPair> {
		let _singleflight = self.session.refresh_guard().lock().await;
		let (epoch, pair) = self.session.snapshot();
		let refresh = pair.map(|pair| pair.refresh_token).ok_or(Error::NoCredential)?;

		self.renew_tracked(&refresh, Target::Session(epoch)).await
	}

	/// Resolves a 401 for `rejected`, returning the access token to retry with.
	///
	/// Tokens that are not the session's own are renewed but never persisted.
	pub(crate) async fn renew_rejected(
		&self,
		rejected: &TokenSecret,
		refresh: &TokenSecret,
	) -> Result<TokenSecret> {
		let _singleflight = self.session.refresh_guard().lock().await;

		if let Some(current) = self.session.renewed_access(rejected, refresh) {
			trace_debug!("Reusing an access token renewed by a concurrent caller.");
			self.renewal_metrics.record_reused();

			return Ok(current);
		}

		let target = match self.session.snapshot() {
			(epoch, None) => Target::Vacant(epoch),
			(epoch, Some(held)) if held.refresh_token == *refresh => Target::Session(epoch),
			(_, Some(_)) => Target::Detached,
		};
		let pair = self.renew_tracked(refresh, target).await.map_err(|err| match err {
			Error::Transport(_) | Error::AuthExpired { .. } | Error::Storage(_) => err,
			other => Error::AuthExpired { reason: other.to_string() },
		})?;

		Ok(pair.access_token)
	}

	/// Calls the renewal endpoint and records the pair according to `target`.
	///
	/// Callers hold the refresh guard.
	async fn renew_tracked(&self, refresh: &TokenSecret, target: Target) -> Result<CredentialPair> {
		self.renewal_metrics.record_attempt();

		let renewed = match self.refresh(refresh).await {
			Ok(pair) => match target {
				Target::Session(epoch) => self.session.rotate_within(epoch, refresh, pair).await,
				Target::Vacant(epoch) =>
					self.session.adopt_within(epoch, pair.clone()).await.map(|()| pair),
				Target::Detached => {
					trace_debug!("Renewed tokens belong to another identity; not persisted.");

					Ok(pair)
				},
			},
			Err(err) => Err(err),
		};

		match &renewed {
			Ok(_) => self.renewal_metrics.record_success(),
			Err(err) => {
				trace_warn!(error = %err, "Access token renewal failed.");
				#[cfg(not(feature = "tracing"))]
				let _ = err;

				self.renewal_metrics.record_failure();
			},
		}

		renewed
	}
}

/// Where a renewed pair goes.
#[derive(Clone, Copy, Debug)]
enum Target {
	/// Rotate the session's own pair, unless the identity changed since the epoch.
	Session(u64),
	/// Sign the empty session in, unless someone signed in or out since the epoch.
	Vacant(u64),
	/// The tokens belong to a caller, not the session.
	Detached,
}

/// Tokens read from a renewal response before retention rules apply.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RenewedTokens {
	pub(crate) access_token: String,
	pub(crate) refresh_token: Option<String>,
}
impl RenewedTokens {
	fn into_pair(self, previous_refresh: &TokenSecret) -> CredentialPair {
		let refresh = match self.refresh_token {
			Some(issued) if issued != previous_refresh.expose() => TokenSecret::new(issued),
			_ => previous_refresh.clone(),
		};

		CredentialPair::new(self.access_token, refresh)
	}
}

/// Reads the renewed tokens from a renewal response body.
pub(crate) fn extract_credentials(body: &[u8]) -> Result<RenewedTokens> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Err(malformed("renewal response body is empty"));
	}

	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let root: Value = serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		Error::MalformedRenewalResponse {
			reason: "renewal response is not valid JSON".into(),
			source: Some(source),
		}
	})?;
	let data = root.get("data");
	let candidates = [data.and_then(|data| data.get("token")), data, Some(&root)];

	for candidate in candidates.iter().flatten() {
		if let (Some(access), Some(refresh)) =
			(non_empty(candidate, "accessToken"), non_empty(candidate, "refreshToken"))
		{
			return Ok(RenewedTokens {
				access_token: access.to_owned(),
				refresh_token: Some(refresh.to_owned()),
			});
		}
	}

	let bare_access = candidates
		.iter()
		.flatten()
		.find_map(|candidate| non_empty(candidate, "accessToken"))
		.or_else(|| data.and_then(Value::as_str).filter(|token| !token.is_empty()));

	match bare_access {
		Some(access) => Ok(RenewedTokens { access_token: access.to_owned(), refresh_token: None }),
		None => Err(malformed("renewal response carries no access token")),
	}
}

fn non_empty<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
	value.get(key)?.as_str().filter(|token| !token.is_empty())
}

fn malformed(reason: &str) -> Error {
	Error::MalformedRenewalResponse { reason: reason.into(), source: None }
}
