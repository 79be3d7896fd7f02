// std
use std::iter::IntoIterator;
// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	request::{ParamPlacement, RequestDescriptor},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// Method is not a valid HTTP token.
	#[error("HTTP method `{method}` is invalid.")]
	InvalidMethod {
		/// Method string that failed validation.
		method: String,
	},
	/// Only HTTP(S) targets can be signed and sent.
	#[error("URL scheme must be http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// Timeout must be strictly positive.
	#[error("Timeout must be positive.")]
	NonPositiveTimeout,
	/// User-agent override cannot be blank.
	#[error("User-agent override cannot be empty.")]
	EmptyUserAgent,
	/// Placement label is not recognized.
	#[error("Parameter placement `{value}` is not recognized.")]
	UnknownPlacement {
		/// Label that failed to parse.
		value: String,
	},
}

/// Builder for [`RequestDescriptor`] values.
#[derive(Debug)]
pub struct RequestDescriptorBuilder {
	/// HTTP method name, parsed on build.
	pub method: String,
	/// Target URL.
	pub url: Url,
	/// Caller parameters.
	pub parameters: BTreeMap<String, String>,
	/// Caller headers.
	pub headers: BTreeMap<String, String>,
	/// Optional raw body.
	pub body: Option<Vec<u8>>,
	/// OAuth parameter placement.
	pub placement: ParamPlacement,
	/// Request timeout.
	pub timeout: Duration,
	/// Optional user-agent override.
	pub user_agent: Option<String>,
}
impl RequestDescriptorBuilder {
	/// Creates a new builder seeded with the target URL.
	pub fn new(url: Url) -> Self {
		Self {
			method: Method::GET.as_str().to_owned(),
			url,
			parameters: BTreeMap::new(),
			headers: BTreeMap::new(),
			body: None,
			placement: ParamPlacement::default(),
			timeout: RequestDescriptor::DEFAULT_TIMEOUT,
			user_agent: None,
		}
	}

	/// Sets the HTTP method.
	pub fn method(mut self, method: impl AsRef<str>) -> Self {
		self.method = method.as_ref().to_owned();

		self
	}

	/// Adds a single caller parameter.
	pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.parameters.insert(key.into(), value.into());

		self
	}

	/// Adds multiple caller parameters.
	pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (key, value) in parameters.into_iter() {
			self.parameters.insert(key.into(), value.into());
		}

		self
	}

	/// Adds a caller header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Sets the raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Overrides the OAuth parameter placement.
	pub fn placement(mut self, placement: ParamPlacement) -> Self {
		self.placement = placement;

		self
	}

	/// Overrides the timeout (defaults to 60 seconds).
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the user-agent for requests built from this descriptor.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<RequestDescriptor, DescriptorError> {
		let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
			.map_err(|_| DescriptorError::InvalidMethod { method: self.method.clone() })?;
		let descriptor = RequestDescriptor {
			method,
			url: self.url,
			parameters: self.parameters,
			headers: self.headers,
			body: self.body,
			placement: self.placement,
			timeout: self.timeout,
			user_agent: self.user_agent,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl RequestDescriptor {
	/// Validates invariants for the descriptor.
	pub fn validate(&self) -> Result<(), DescriptorError> {
		if !matches!(self.url.scheme(), "http" | "https") {
			return Err(DescriptorError::UnsupportedScheme { url: self.url.to_string() });
		}
		if !self.timeout.is_positive() {
			return Err(DescriptorError::NonPositiveTimeout);
		}
		if self.user_agent.as_deref().is_some_and(|value| value.trim().is_empty()) {
			return Err(DescriptorError::EmptyUserAgent);
		}

		Ok(())
	}
}
