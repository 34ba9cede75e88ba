//! Authenticated requests with one refresh-and-retry cycle on 401.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::AuthenticatedClient,
	http::{ApiHttpClient, ApiRequest, ApiResponse},
	obs::{self, CallKind, CallOutcome, CallSpan, trace_debug},
	transport::TransportErrorMapper,
};

impl<C, M> AuthenticatedClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends `request` with the session's current tokens.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		let pair = self.session.current();

		self.request_with_tokens(
			request,
			pair.as_ref().map(|pair| &pair.access_token),
			pair.as_ref().map(|pair| &pair.refresh_token),
		)
		.await
	}

	/// Sends `request` as `Authorization: Bearer <access>`.
	///
	/// - Without an access token the call fails with [`Error::NoCredential`] and nothing
	///   is sent.
	/// - A 401 with a refresh token available triggers one renewal (or reuses a token
	///   another caller just renewed from the same refresh token) and the identical
	///   request is reissued once. Only the session's own pair is persisted.
	/// - Any other status, a 401 without a refresh token, and the retried response are
	///   returned as-is.
	///
	/// A failed renewal surfaces as [`Error::AuthExpired`], except transport failures,
	/// which propagate unchanged.
	pub async fn request_with_tokens(
		&self,
		request: ApiRequest,
		access: Option<&TokenSecret>,
		refresh: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "request_with_tokens");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let access =
					access.filter(|token| !token.is_empty()).ok_or(Error::NoCredential)?;
				let response = self.dispatch(KIND, &request, Some(access)).await?;

				if !response.is_unauthorized() {
					return Ok(response);
				}

				let Some(refresh) = refresh.filter(|token| !token.is_empty()) else {
					trace_debug!("Access token rejected and no refresh token is available.");

					return Ok(response);
				};

				trace_debug!(method = %request.method, url = %request.url, "Access token rejected; renewing.");

				let renewed = self.renew_rejected(access, refresh).await?;

				self.dispatch(KIND, &request, Some(&renewed)).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
