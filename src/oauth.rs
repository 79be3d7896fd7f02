//! OAuth 1.0a request signing.
//!
//! [`sign_request`] merges the URL query, the caller parameters, and freshly generated
//! protocol parameters, builds the RFC 5849 signature base string, and hands it to a
//! [`Signer`]. The resulting [`SignedRequest`] is never reused across sends because every
//! attempt needs its own nonce and timestamp.

pub mod encoding;
pub mod signer;

pub use encoding::*;
pub use signer::*;

// crates.io
use http::Method;
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::BuildError,
	request::{ParamPlacement, RequestDescriptor},
};

/// Protocol version advertised in `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";
/// Prefix shared by every protocol parameter.
pub const OAUTH_PARAM_PREFIX: &str = "oauth_";

const NONCE_LEN: usize = 32;

/// Per-attempt timestamp and nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolSeed {
	/// Seconds since the Unix epoch.
	pub timestamp: i64,
	/// Random value unique to this attempt.
	pub nonce: String,
}
impl ProtocolSeed {
	/// Draws the current time and a fresh nonce from the thread-local CSPRNG.
	pub fn generate() -> Self {
		Self { timestamp: OffsetDateTime::now_utc().unix_timestamp(), nonce: generate_nonce() }
	}

	/// Uses caller-provided values; intended for reproducible signatures.
	pub fn fixed(timestamp: i64, nonce: impl Into<String>) -> Self {
		Self { timestamp, nonce: nonce.into() }
	}
}

/// Signed parameter set produced for exactly one send attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
	/// HTTP method that was signed.
	pub method: Method,
	/// Target URL as supplied, including any query pairs.
	pub url: Url,
	/// Caller parameters.
	pub parameters: BTreeMap<String, String>,
	/// Protocol parameters, including `oauth_signature`.
	pub oauth_parameters: BTreeMap<String, String>,
	/// Signature base string the signer saw.
	pub base_string: String,
	/// Where the protocol parameters must be carried.
	pub placement: ParamPlacement,
}
impl SignedRequest {
	/// Returns the computed `oauth_signature` value.
	pub fn signature(&self) -> &str {
		self.oauth_parameters.get("oauth_signature").map(String::as_str).unwrap_or_default()
	}
}

/// Builds and signs the OAuth parameter set for `descriptor`.
pub fn sign_request(
	credentials: &Credentials,
	descriptor: &RequestDescriptor,
	signer: &dyn Signer,
	seed: ProtocolSeed,
) -> Result<SignedRequest, BuildError> {
	if credentials.consumer.key.trim().is_empty() {
		return Err(BuildError::MissingCredential);
	}
	if let Some(name) = descriptor.parameters.keys().find(|key| key.starts_with(OAUTH_PARAM_PREFIX))
	{
		return Err(BuildError::ReservedParameter { name: name.clone() });
	}

	let mut oauth_parameters = BTreeMap::new();

	oauth_parameters.insert("oauth_consumer_key".to_owned(), credentials.consumer.key.clone());
	oauth_parameters.insert("oauth_nonce".to_owned(), seed.nonce);
	oauth_parameters.insert("oauth_signature_method".to_owned(), signer.method().to_owned());
	oauth_parameters.insert("oauth_timestamp".to_owned(), seed.timestamp.to_string());

	if let Some(token) = &credentials.token {
		oauth_parameters.insert("oauth_token".to_owned(), token.value.clone());
	}

	oauth_parameters.insert("oauth_version".to_owned(), OAUTH_VERSION.to_owned());

	let base_string = base_string(
		&descriptor.method,
		&descriptor.url,
		descriptor.parameters.iter().chain(oauth_parameters.iter()),
	);
	let signature = signer.sign(
		&base_string,
		credentials.consumer.secret.expose(),
		credentials.token_secret(),
	)?;

	oauth_parameters.insert("oauth_signature".to_owned(), signature);

	Ok(SignedRequest {
		method: descriptor.method.clone(),
		url: descriptor.url.clone(),
		parameters: descriptor.parameters.clone(),
		oauth_parameters,
		base_string,
		placement: descriptor.placement,
	})
}

/// Builds the signature base string from the method, the URL (whose query pairs are
/// included), and the remaining request parameters.
pub fn base_string<I, K, V>(method: &Method, url: &Url, parameters: I) -> String
where
	I: IntoIterator<Item = (K, V)>,
	K: AsRef<str>,
	V: AsRef<str>,
{
	let mut pairs = url
		.query_pairs()
		.map(|(key, value)| (percent_encode(&key).into_owned(), percent_encode(&value).into_owned()))
		.chain(parameters.into_iter().filter(|(key, _)| key.as_ref() != "oauth_signature").map(
			|(key, value)| {
				(percent_encode(key.as_ref()).into_owned(), percent_encode(value.as_ref()).into_owned())
			},
		))
		.collect::<Vec<_>>();

	pairs.sort();

	let normalized = pairs
		.iter()
		.map(|(key, value)| format!("{key}={value}"))
		.collect::<Vec<_>>()
		.join("&");

	format!(
		"{}&{}&{}",
		method.as_str().to_ascii_uppercase(),
		percent_encode(&normalized_url(url)),
		percent_encode(&normalized)
	)
}

/// Returns the base string URI: scheme and authority without default ports, plus the path.
pub fn normalized_url(url: &Url) -> String {
	let mut normalized = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());

	if let Some(port) = url.port() {
		normalized.push(':');
		normalized.push_str(&port.to_string());
	}

	normalized.push_str(url.path());

	normalized
}

fn generate_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}
