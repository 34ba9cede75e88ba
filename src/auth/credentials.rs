//! The access/refresh token pair owned by a signed-in session.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access and refresh token obtained together from login or renewal.
///
/// Both halves are always replaced together; there is no setter for either
/// field alone.
#[derive(Clone)]
pub struct CredentialPair {
	/// Short-lived bearer presented on every authenticated call.
	pub access_token: TokenSecret,
	/// Longer-lived bearer used only against the renewal endpoint.
	pub refresh_token: TokenSecret,
	/// Local instant the pair was obtained or restored.
	pub issued_at: OffsetDateTime,
}
impl CredentialPair {
	/// Creates a pair stamped with the current UTC instant.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Overrides the issued-at instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Returns `true` when both tokens match `other`, ignoring timestamps.
	pub fn same_tokens(&self, other: &Self) -> bool {
		self.access_token == other.access_token && self.refresh_token == other.refresh_token
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.finish()
	}
}
