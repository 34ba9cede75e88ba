//! Backend service descriptor: the validated base URL and the fixed endpoint paths.
//!
//! Every endpoint the client calls is a fixed path joined onto the descriptor's base
//! URL, so a deployment only configures the base. The base must use HTTPS; loopback
//! hosts may use plain HTTP for local development and mock servers.

mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Base URL of the production backend.
pub const DEFAULT_BASE_URL: &str = "https://capstone-be-oasis.onrender.com";

/// Fixed endpoint paths relative to the base URL.
pub mod paths {
	/// Guardian sign-up.
	pub const GUARDIAN_REGISTER: &str = "/guardians/auth/register";
	/// Guardian login issuing the first credential pair.
	pub const GUARDIAN_LOGIN: &str = "/guardians/auth/login";
	/// Access token renewal, authenticated with the refresh token.
	pub const RENEW: &str = "/guardians/auth/renew";
	/// Registers a new taker under the signed-in guardian.
	pub const TAKER_REGISTER: &str = "/guardians/auth/taker-register";
	/// Connects a registered taker to a device id.
	pub const TAKER_CONNECT: &str = "/guardians/auth/taker-connect";
	/// Lists the guardian's takers.
	pub const TAKER_LIST: &str = "/guardians/data/taker-list";
	/// Dosage schedule collection (GET/POST/PATCH/DELETE).
	pub const SCHEDULE: &str = "/guardians/data/schedule";
	/// Registers a taker device's push token and issues its device id.
	pub const DEVICE_INIT: &str = "/takers/auth/init";
	/// Today's medications for a taker device.
	pub const TAKER_MEDS: &str = "/takers/data/meds";
}

/// Immutable backend descriptor consumed by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
	/// Validated base URL; endpoint paths are appended to its path.
	pub base_url: Url,
}
impl ServiceDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::default()
	}

	/// Builds the URL for a fixed endpoint path.
	pub fn endpoint(&self, path: &str) -> Url {
		let mut url = self.base_url.clone();
		let joined =
			format!("{}/{}", url.path().trim_end_matches('/'), path.trim_start_matches('/'));

		url.set_path(&joined);

		url
	}

	/// Builds the URL for a fixed endpoint path with query pairs appended.
	pub fn endpoint_with_query<'a, I>(&self, path: &str, query: I) -> Url
	where
		I: IntoIterator<Item = (&'a str, &'a str)>,
	{
		let mut url = self.endpoint(path);

		{
			let mut pairs = url.query_pairs_mut();

			for (key, value) in query {
				pairs.append_pair(key, value);
			}
		}

		if url.query() == Some("") {
			url.set_query(None);
		}

		url
	}
}
impl Default for ServiceDescriptor {
	fn default() -> Self {
		Self { base_url: Url::parse(DEFAULT_BASE_URL).expect("Default base URL must parse.") }
	}
}
