//! Conversion of a [`SignedRequest`] into a [`TransportRequest`].

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue,
	header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	error::BuildError,
	oauth::{OAUTH_PARAM_PREFIX, SignedRequest, encode_pairs, percent_encode},
	request::{ParamPlacement, RequestDescriptor},
	transport::TransportRequest,
};

/// Media type used for form-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Applies the placement policy and assembles the final method, URL, headers, and body.
///
/// Caller parameters go into a form body when [`RequestDescriptor::parameters_in_body`]
/// holds and into the query otherwise. OAuth parameters follow
/// [`SignedRequest::placement`]. Caller headers are applied last and replace derived
/// `Authorization`, `Content-Type`, or `User-Agent` values.
pub fn build_transport_request(
	signed: &SignedRequest,
	descriptor: &RequestDescriptor,
	user_agent: &str,
) -> Result<TransportRequest, BuildError> {
	if signed.placement == ParamPlacement::Body && descriptor.body.is_some() {
		return Err(BuildError::ConflictingBody);
	}

	let mut query_pairs = Vec::new();
	let mut body_pairs = Vec::new();
	let mut headers = HeaderMap::new();

	if descriptor.parameters_in_body() {
		body_pairs.extend(signed.parameters.iter());
	} else {
		query_pairs.extend(signed.parameters.iter());
	}

	match signed.placement {
		ParamPlacement::Query => query_pairs.extend(signed.oauth_parameters.iter()),
		ParamPlacement::Header => {
			let value = header_value(AUTHORIZATION.as_str(), &authorization_header(signed))?;

			headers.insert(AUTHORIZATION, value);
		},
		ParamPlacement::Body => body_pairs.extend(signed.oauth_parameters.iter()),
	}

	let mut url = signed.url.clone();

	if !query_pairs.is_empty() {
		let extra = encode_pairs(query_pairs);
		let query = match url.query() {
			Some(existing) if !existing.is_empty() => format!("{existing}&{extra}"),
			_ => extra,
		};

		url.set_query(Some(&query));
	}

	let body = if body_pairs.is_empty() {
		descriptor.body.clone().map(Bytes::from)
	} else {
		headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

		Some(Bytes::from(encode_pairs(body_pairs)))
	};
	let user_agent = descriptor.user_agent.as_deref().unwrap_or(user_agent);

	headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), user_agent)?);

	for (name, value) in &descriptor.headers {
		let header_name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| BuildError::InvalidHeader { name: name.clone() })?;

		headers.insert(header_name, header_value(name, value)?);
	}

	Ok(TransportRequest {
		method: signed.method.clone(),
		url,
		headers,
		body,
		timeout: descriptor.timeout,
	})
}

/// Renders `OAuth k="v", ...` from the protocol parameters.
pub fn authorization_header(signed: &SignedRequest) -> String {
	let fields = signed
		.oauth_parameters
		.iter()
		.filter(|(key, _)| key.starts_with(OAUTH_PARAM_PREFIX))
		.map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
		.collect::<Vec<_>>()
		.join(", ");

	format!("OAuth {fields}")
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, BuildError> {
	HeaderValue::from_str(value).map_err(|_| BuildError::InvalidHeader { name: name.to_owned() })
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::Method;
	// self
	use super::*;
	use crate::{
		auth::{Consumer, Credentials},
		oauth::{HmacSha1Signer, ProtocolSeed, sign_request},
	};

	const UA: &str = "oauth1-request-client/test";

	fn descriptor(url: &str, placement: ParamPlacement) -> RequestDescriptor {
		RequestDescriptor::builder(Url::parse(url).expect("Failed to parse test URL."))
			.placement(placement)
			.build()
			.expect("Test descriptor should build.")
	}

	fn sign(descriptor: &RequestDescriptor) -> SignedRequest {
		sign_request(
			&Credentials::new(Consumer::new("ck", "cs"), None),
			descriptor,
			&HmacSha1Signer,
			ProtocolSeed::fixed(1_318_622_958, "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
		)
		.expect("Test request should sign.")
	}

	fn header(request: &TransportRequest, name: HeaderName) -> &str {
		request
			.headers
			.get(name)
			.and_then(|value| value.to_str().ok())
			.expect("Header should be present and printable.")
	}

	#[test]
	fn header_placement_keeps_user_params_in_url() {
		let descriptor =
			descriptor("https://api.example.com/v1/resource?q=1", ParamPlacement::Header);
		let signed = sign(&descriptor);
		let request =
			build_transport_request(&signed, &descriptor, UA).expect("Request should build.");
		let authorization = header(&request, AUTHORIZATION);

		assert!(authorization.starts_with("OAuth "));
		assert!(authorization.contains("oauth_consumer_key=\"ck\""));
		assert!(authorization.contains("oauth_signature_method=\"HMAC-SHA1\""));
		assert!(authorization.contains(&format!(
			"oauth_signature=\"{}\"",
			percent_encode(signed.signature())
		)));
		assert!(!authorization.contains("q="));
		assert_eq!(request.url.as_str(), "https://api.example.com/v1/resource?q=1");
		assert_eq!(header(&request, USER_AGENT), UA);
		assert!(request.body.is_none());
	}

	#[test]
	fn query_placement_round_trips_oauth_params() {
		let mut descriptor = descriptor("https://api.example.com/v1/search", ParamPlacement::Query);

		descriptor.set_parameter("term", "rust & oauth");

		let signed = sign(&descriptor);
		let request =
			build_transport_request(&signed, &descriptor, UA).expect("Request should build.");
		let parsed = request.url.query_pairs().into_owned().collect::<BTreeMap<_, _>>();

		for (key, value) in &signed.oauth_parameters {
			assert_eq!(parsed.get(key), Some(value), "`{key}` must survive the query round trip.");
		}

		assert_eq!(parsed.get("term").map(String::as_str), Some("rust & oauth"));
		assert!(request.headers.get(AUTHORIZATION).is_none());
	}

	#[test]
	fn body_placement_form_encodes_everything() {
		let mut descriptor = descriptor("https://api.example.com/v1/status", ParamPlacement::Body);

		descriptor.method = Method::POST;
		descriptor.set_parameter("status", "hello world");

		let signed = sign(&descriptor);
		let request =
			build_transport_request(&signed, &descriptor, UA).expect("Request should build.");
		let body = request.body.as_ref().expect("Body placement must produce a body.");
		let body = std::str::from_utf8(body).expect("Form body should be UTF-8.");

		assert_eq!(header(&request, CONTENT_TYPE), FORM_CONTENT_TYPE);
		assert!(body.contains("status=hello%20world"));
		assert!(body.contains("oauth_consumer_key=ck"));
		assert!(body.contains(&format!("oauth_signature={}", percent_encode(signed.signature()))));
		assert_eq!(request.url.query(), None);
	}

	#[test]
	fn body_placement_conflicts_with_raw_body() {
		let mut descriptor = descriptor("https://api.example.com/v1/upload", ParamPlacement::Body);

		descriptor.method = Method::POST;
		descriptor.body = Some(b"raw".to_vec());

		let signed = sign(&descriptor);
		let err = build_transport_request(&signed, &descriptor, UA)
			.expect_err("Raw bodies must conflict with body placement.");

		assert!(matches!(err, BuildError::ConflictingBody));
	}

	#[test]
	fn caller_headers_override_derived_headers() {
		let mut descriptor = descriptor("https://api.example.com/v1/me", ParamPlacement::Header);

		descriptor.set_header("user-agent", "custom-agent/2.0");
		descriptor.set_header("Accept", "application/json");

		let signed = sign(&descriptor);
		let request =
			build_transport_request(&signed, &descriptor, UA).expect("Request should build.");

		assert_eq!(header(&request, USER_AGENT), "custom-agent/2.0");
		assert_eq!(header(&request, http::header::ACCEPT), "application/json");

		descriptor.set_header("bad header", "value");

		let err = build_transport_request(&signed, &descriptor, UA)
			.expect_err("Header names with spaces must be rejected.");

		assert!(matches!(err, BuildError::InvalidHeader { name } if name == "bad header"));
	}

	#[test]
	fn raw_body_post_sends_params_in_query() {
		let mut descriptor = descriptor("https://api.example.com/v1/upload", ParamPlacement::Header);

		descriptor.method = Method::POST;
		descriptor.body = Some(b"{\"a\":1}".to_vec());
		descriptor.set_parameter("kind", "json");
		descriptor.user_agent = Some("override/1.0".into());

		let signed = sign(&descriptor);
		let request =
			build_transport_request(&signed, &descriptor, UA).expect("Request should build.");

		assert_eq!(request.url.query(), Some("kind=json"));
		assert_eq!(request.body.as_deref(), Some(&b"{\"a\":1}"[..]));
		assert_eq!(header(&request, USER_AGENT), "override/1.0");
	}

	#[test]
	fn building_is_deterministic() {
		let descriptor =
			descriptor("https://api.example.com/v1/resource?q=1", ParamPlacement::Query);
		let signed = sign(&descriptor);

		assert_eq!(
			build_transport_request(&signed, &descriptor, UA).ok(),
			build_transport_request(&signed, &descriptor, UA).ok()
		);
	}
}
