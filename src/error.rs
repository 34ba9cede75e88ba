//! Client-level error types shared by sessions, stores, renewals, and endpoint calls.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured JSON decoding failure carrying the path of the offending field.
pub type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No access token is available; the caller must sign in first.
	#[error("No access token is available; sign in is required.")]
	NoCredential,
	/// The backend rejected the access token and renewing it failed.
	#[error("Session expired: {reason}.")]
	AuthExpired {
		/// Client-supplied reason string.
		reason: String,
	},
	/// The renewal endpoint answered with a body that carries no usable access token.
	#[error("Renewal endpoint returned a malformed response: {reason}.")]
	MalformedRenewalResponse {
		/// Client-supplied reason string.
		reason: String,
		/// JSON parsing failure, when the body was not valid JSON.
		#[source]
		source: Option<JsonPathError>,
	},
	/// The backend answered with a non-success status.
	#[error("Backend returned HTTP {status}: {body}.")]
	Remote {
		/// HTTP status code.
		status: u16,
		/// Response body decoded lossily as UTF-8.
		body: String,
	},
	/// The backend answered with a success status but without the expected payload.
	#[error("Backend returned an unexpected response: {reason}.")]
	UnexpectedResponse {
		/// Client-supplied reason string.
		reason: String,
	},
	/// A response body could not be decoded into the expected type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured decoding failure.
		#[source]
		source: JsonPathError,
	},
	/// Caller-supplied input failed validation before any request was sent.
	#[error("Invalid input: {reason}.")]
	InvalidInput {
		/// Validation failure description.
		reason: String,
	},
}
impl Error {
	/// Returns `true` when the caller should discard the session and sign in again.
	pub fn requires_login(&self) -> bool {
		matches!(
			self,
			Self::NoCredential
				| Self::AuthExpired { .. }
				| Self::MalformedRenewalResponse { .. }
				| Self::Remote { status: 401, .. }
		)
	}

	pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
		Self::InvalidInput { reason: reason.into() }
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A token cannot be carried in an `Authorization` header.
	#[error("Token contains characters that are not valid in an HTTP header.")]
	InvalidHeaderValue(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized to JSON.")]
	Encode(#[from] serde_json::Error),
	/// Service descriptor failed validation.
	#[error(transparent)]
	Service(#[from] crate::service::ServiceDescriptorError),
	/// A request timestamp could not be formatted.
	#[error("Request timestamp could not be formatted.")]
	Timestamp(#[from] time::error::Format),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
	/// Transport failure reported only as a message.
	#[error("HTTP client error occurred while calling the backend: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
