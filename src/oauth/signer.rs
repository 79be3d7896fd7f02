//! Signature method contracts plus the HMAC-SHA1 and PLAINTEXT implementations.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
// self
use crate::{error::SigningError, oauth::percent_encode};

type HmacSha1 = Hmac<Sha1>;

/// Produces `oauth_signature` values for a signature base string.
///
/// Implementations receive the raw consumer and token secrets (the token secret is empty
/// for two-legged requests) and decide how to derive key material from them, so RSA or
/// hardware-backed signers can plug in without touching the request builder.
pub trait Signer
where
	Self: Send + Sync,
{
	/// Value advertised in `oauth_signature_method`.
	fn method(&self) -> &str;

	/// Signs `base_string` with the provided secrets.
	fn sign(
		&self,
		base_string: &str,
		consumer_secret: &str,
		token_secret: &str,
	) -> Result<String, SigningError>;
}

/// `HMAC-SHA1` signer (RFC 5849 §3.4.2).
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSha1Signer;
impl Signer for HmacSha1Signer {
	fn method(&self) -> &str {
		"HMAC-SHA1"
	}

	fn sign(
		&self,
		base_string: &str,
		consumer_secret: &str,
		token_secret: &str,
	) -> Result<String, SigningError> {
		let key = signing_key(consumer_secret, token_secret);
		let mut mac = HmacSha1::new_from_slice(key.as_bytes())
			.map_err(|e| SigningError::InvalidKey { reason: e.to_string() })?;

		mac.update(base_string.as_bytes());

		Ok(STANDARD.encode(mac.finalize().into_bytes()))
	}
}

/// `PLAINTEXT` signer (RFC 5849 §3.4.4); only safe over TLS.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaintextSigner;
impl Signer for PlaintextSigner {
	fn method(&self) -> &str {
		"PLAINTEXT"
	}

	fn sign(
		&self,
		_base_string: &str,
		consumer_secret: &str,
		token_secret: &str,
	) -> Result<String, SigningError> {
		Ok(signing_key(consumer_secret, token_secret))
	}
}

/// Joins the encoded consumer and token secrets with `&`.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
	format!("{}&{}", percent_encode(consumer_secret), percent_encode(token_secret))
}
