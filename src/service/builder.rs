// self
use crate::{_prelude::*, service::ServiceDescriptor};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ServiceDescriptorError {
	/// The base URL string could not be parsed.
	#[error("Base URL is invalid: {source}.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The base URL uses plain HTTP for a non-loopback host.
	#[error("The base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// The base URL cannot have paths appended (e.g. `mailto:`).
	#[error("The base URL cannot carry endpoint paths: {url}.")]
	NotABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// The base URL carries a query string or fragment.
	#[error("The base URL must not carry a query or fragment: {url}.")]
	UnexpectedQuery {
		/// Base URL that failed validation.
		url: String,
	},
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug, Default)]
pub struct ServiceDescriptorBuilder {
	/// Base URL; [`DEFAULT_BASE_URL`](crate::service::DEFAULT_BASE_URL) when unset.
	pub base_url: Option<Url>,
}
impl ServiceDescriptorBuilder {
	/// Sets the base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Parses and sets the base URL.
	pub fn base_url_str(self, url: &str) -> Result<Self, ServiceDescriptorError> {
		let url = Url::parse(url).map_err(|source| ServiceDescriptorError::InvalidBaseUrl { source })?;

		Ok(self.base_url(url))
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, ServiceDescriptorError> {
		let descriptor = match self.base_url {
			Some(base_url) => ServiceDescriptor { base_url },
			None => ServiceDescriptor::default(),
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ServiceDescriptor {
	fn validate(&self) -> Result<(), ServiceDescriptorError> {
		let url = &self.base_url;

		if url.cannot_be_a_base() {
			return Err(ServiceDescriptorError::NotABase { url: url.to_string() });
		}
		if url.query().is_some() || url.fragment().is_some() {
			return Err(ServiceDescriptorError::UnexpectedQuery { url: url.to_string() });
		}

		match url.scheme() {
			"https" => Ok(()),
			"http" if is_loopback(url) => Ok(()),
			_ => Err(ServiceDescriptorError::InsecureBaseUrl { url: url.to_string() }),
		}
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
