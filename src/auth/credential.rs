//! Immutable consumer and token credentials.

// self
use crate::{_prelude::*, auth::Secret};

/// OAuth consumer credential identifying the calling application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
	/// Consumer key sent as `oauth_consumer_key`.
	pub key: String,
	/// Consumer secret; only ever used as signing key material.
	pub secret: Secret,
}
impl Consumer {
	/// Creates a consumer credential.
	pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { key: key.into(), secret: Secret::new(secret) }
	}
}

/// OAuth token credential identifying the user on whose behalf the request is made.
///
/// Requests without a token are two-legged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Token value sent as `oauth_token`.
	pub value: String,
	/// Token secret; only ever used as signing key material.
	pub secret: Secret,
}
impl Token {
	/// Creates a token credential.
	pub fn new(value: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { value: value.into(), secret: Secret::new(secret) }
	}
}

/// Consumer plus optional token, fixed for the lifetime of a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Application credential.
	pub consumer: Consumer,
	/// User credential; `None` for two-legged requests.
	pub token: Option<Token>,
}
impl Credentials {
	/// Bundles a consumer with an optional token.
	pub fn new(consumer: Consumer, token: Option<Token>) -> Self {
		Self { consumer, token }
	}

	/// Returns `true` when no token is present.
	pub fn is_two_legged(&self) -> bool {
		self.token.is_none()
	}

	/// Token secret used in the signing key, empty for two-legged requests.
	pub fn token_secret(&self) -> &str {
		self.token.as_ref().map(|token| token.secret.expose()).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_presence_decides_legs_and_key_material() {
		let two_legged = Credentials::new(Consumer::new("ck", "cs"), None);

		assert!(two_legged.is_two_legged());
		assert_eq!(two_legged.token_secret(), "");

		let three_legged =
			Credentials::new(Consumer::new("ck", "cs"), Some(Token::new("tok", "ts")));

		assert!(!three_legged.is_two_legged());
		assert_eq!(three_legged.token_secret(), "ts");
	}
}
