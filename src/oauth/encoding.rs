//! RFC 3986 percent-encoding used by signatures and every wire placement.

// std
use std::{borrow::Cow, string::FromUtf8Error};

/// Percent-encodes everything except the RFC 3986 unreserved set (`A-Z a-z 0-9 - . _ ~`).
pub fn percent_encode(value: &str) -> Cow<'_, str> {
	urlencoding::encode(value)
}

/// Reverses [`percent_encode`].
pub fn percent_decode(value: &str) -> Result<Cow<'_, str>, FromUtf8Error> {
	urlencoding::decode(value)
}

/// Joins pairs as `key=value` separated by `&`, encoding both sides.
pub fn encode_pairs<I, K, V>(pairs: I) -> String
where
	I: IntoIterator<Item = (K, V)>,
	K: AsRef<str>,
	V: AsRef<str>,
{
	pairs
		.into_iter()
		.map(|(key, value)| {
			format!("{}={}", percent_encode(key.as_ref()), percent_encode(value.as_ref()))
		})
		.collect::<Vec<_>>()
		.join("&")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn encodes_reserved_characters() {
		assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
		assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
		assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
		assert_eq!(percent_encode("☃"), "%E2%98%83");
		assert_eq!(percent_encode("-._~"), "-._~");
	}

	#[test]
	fn pairs_are_joined_in_order() {
		assert_eq!(encode_pairs([("a b", "c&d"), ("e", "")]), "a%20b=c%26d&e=");
		assert_eq!(percent_decode("c%26d").ok().as_deref(), Some("c&d"));
	}
}
