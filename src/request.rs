//! Mutable request descriptor and OAuth parameter placement.
//!
//! A [`RequestDescriptor`] describes one outbound call: method, URL, caller parameters,
//! headers, optional raw body, where the signed OAuth parameters travel, the timeout,
//! and an optional user-agent override. Clients clone the descriptor at the start of
//! every send so edits made while a request is in flight only apply to the next send.

/// Builder API for assembling validated descriptors.
pub mod builder;

pub use builder::*;

// crates.io
use http::Method;
// self
use crate::_prelude::*;

/// Where the signed OAuth parameters are carried on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamPlacement {
	/// Appended to the URL query string.
	#[serde(alias = "url", alias = "uri")]
	Query,
	#[default]
	/// Sent as a single `Authorization: OAuth ...` header.
	#[serde(alias = "authorization")]
	Header,
	/// Encoded into an `application/x-www-form-urlencoded` body.
	#[serde(alias = "post")]
	Body,
}
impl ParamPlacement {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ParamPlacement::Query => "query",
			ParamPlacement::Header => "header",
			ParamPlacement::Body => "body",
		}
	}
}
impl Display for ParamPlacement {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ParamPlacement {
	type Err = DescriptorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"query" | "url" | "uri" => Ok(Self::Query),
			"header" | "authorization" => Ok(Self::Header),
			"body" | "post" => Ok(Self::Body),
			_ => Err(DescriptorError::UnknownPlacement { value: s.to_owned() }),
		}
	}
}

/// Everything needed to sign and send one request, minus the credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
	/// HTTP method; defaults to `GET`.
	#[serde(with = "method_serde", default = "default_method")]
	pub method: Method,
	/// Target URL. Query pairs already present take part in the signature.
	pub url: Url,
	/// Caller parameters; ordered so signatures are deterministic.
	#[serde(default)]
	pub parameters: BTreeMap<String, String>,
	/// Caller headers; these win over OAuth-derived headers on collision.
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes, sent verbatim.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Vec<u8>>,
	/// Location of the signed OAuth parameters.
	#[serde(default)]
	pub placement: ParamPlacement,
	/// Upper bound for blocking and awaited sends.
	#[serde(with = "timeout_serde", default = "default_timeout")]
	pub timeout: Duration,
	/// Replaces the client's user-agent for this descriptor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_agent: Option<String>,
}
impl RequestDescriptor {
	/// Default timeout applied when none is configured.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(60);

	/// Creates a `GET` descriptor for `url` with default settings.
	pub fn new(url: Url) -> Self {
		Self {
			method: Method::GET,
			url,
			parameters: BTreeMap::new(),
			headers: BTreeMap::new(),
			body: None,
			placement: ParamPlacement::default(),
			timeout: Self::DEFAULT_TIMEOUT,
			user_agent: None,
		}
	}

	/// Creates a new builder for the provided URL.
	pub fn builder(url: Url) -> RequestDescriptorBuilder {
		RequestDescriptorBuilder::new(url)
	}

	/// Inserts or replaces a caller parameter.
	pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.parameters.insert(key.into(), value.into());
	}

	/// Inserts or replaces a caller header.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.headers.insert(name.into(), value.into());
	}

	/// Returns `true` when the method conventionally carries an entity body.
	pub fn method_allows_body(&self) -> bool {
		matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
	}

	/// Returns `true` when caller parameters travel in a form body rather than the query.
	pub fn parameters_in_body(&self) -> bool {
		self.body.is_none() && (self.placement == ParamPlacement::Body || self.method_allows_body())
	}
}

fn default_method() -> Method {
	Method::GET
}

fn default_timeout() -> Duration {
	RequestDescriptor::DEFAULT_TIMEOUT
}

mod method_serde {
	// crates.io
	use http::Method;
	use serde::{Deserializer, Serializer, de::Error as _};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(method: &Method, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(method.as_str())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Method, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(D::Error::custom)
	}
}

// Seconds as a float, matching how timeouts are usually written in config files.
mod timeout_serde {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as _};
	// self
	use crate::_prelude::*;

	const MAX_TIMEOUT_SECS: f64 = 86_400.0 * 365.0;

	pub fn serialize<S>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(timeout.as_seconds_f64())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = f64::deserialize(deserializer)?;

		if !secs.is_finite() || secs <= 0.0 || secs > MAX_TIMEOUT_SECS {
			return Err(D::Error::custom("timeout must be a positive number of seconds"));
		}

		Ok(Duration::seconds_f64(secs))
	}
}
