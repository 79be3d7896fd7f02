#![cfg(feature = "reqwest")]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use oauth1_request_client::{
	auth::{Consumer, Token},
	client::{AttemptState, Outcome, RequestClient},
	error::Error,
	request::{ParamPlacement, RequestDescriptor},
	url::Url,
};

fn client(
	server: &MockServer,
	path: &str,
	build: impl FnOnce(&mut RequestDescriptor),
) -> RequestClient {
	let url = Url::parse(&server.url(path)).expect("Mock server URL should parse.");
	let mut descriptor = RequestDescriptor::new(url);

	descriptor.timeout = Duration::seconds(5);
	build(&mut descriptor);

	RequestClient::new(Consumer::new("ck", "cs"), Some(Token::new("tok", "ts")), descriptor)
}

#[tokio::test]
async fn header_placement_reaches_server() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/photos")
				.query_param("size", "original")
				.header_exists("authorization");
			then.status(200).header("content-type", "text/plain").body("photo");
		})
		.await;
	let client = client(&server, "/photos", |descriptor| {
		descriptor.set_parameter("size", "original");
	});
	let response = client.send().await.expect("Signed GET should succeed.");

	mock.assert_async().await;

	assert!(response.is_success());
	assert_eq!(response.text().expect("Body should be UTF-8."), "photo");
	assert_eq!(client.state(), AttemptState::Completed);
}

#[tokio::test]
async fn query_placement_carries_oauth_parameters() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/search")
				.query_param("q", "rust")
				.query_param("oauth_consumer_key", "ck")
				.query_param("oauth_token", "tok")
				.query_param("oauth_signature_method", "HMAC-SHA1")
				.query_param("oauth_version", "1.0")
				.query_param_exists("oauth_signature");
			then.status(200).body("[]");
		})
		.await;
	let client = client(&server, "/search?q=rust", |descriptor| {
		descriptor.placement = ParamPlacement::Query;
	});
	let Outcome::Finished(response) =
		client.send_async().expect("Async send should start.").outcome().await
	else {
		panic!("Async send should finish.");
	};

	mock.assert_async().await;

	assert_eq!(response.body, "[]");
}

#[tokio::test]
async fn body_placement_posts_form() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/statuses")
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("status", "hello world")
				.form_urlencoded_tuple("oauth_consumer_key", "ck")
				.form_urlencoded_tuple_exists("oauth_signature");
			then.status(201);
		})
		.await;
	let client = client(&server, "/statuses", |descriptor| {
		descriptor.method = http::Method::POST;
		descriptor.placement = ParamPlacement::Body;
		descriptor.set_parameter("status", "hello world");
	});
	let response = client.send().await.expect("Signed POST should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status.as_u16(), 201);
}

#[tokio::test]
async fn slow_server_can_be_cancelled() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(StdDuration::from_secs(3)).body("late");
		})
		.await;
	let client = client(&server, "/slow", |_| {});
	let in_flight = client.send_async().expect("Async send should start.");

	tokio::time::sleep(StdDuration::from_millis(100)).await;

	assert!(client.cancel());
	assert!(matches!(in_flight.outcome().await, Outcome::Cancelled));
	assert!(!client.cancel());
	assert_eq!(client.state(), AttemptState::Cancelled);
}

#[tokio::test]
async fn slow_server_times_out() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(StdDuration::from_secs(3)).body("late");
		})
		.await;
	let client = client(&server, "/slow", |descriptor| {
		descriptor.timeout = Duration::milliseconds(200);
	});

	assert!(matches!(client.send().await, Err(Error::Timeout { .. })));
	assert_eq!(client.state(), AttemptState::Failed);
}

#[test]
fn blocking_send_returns_full_body() {
	let server = MockServer::start();
	let mock = server.mock(|when, then| {
		when.method(GET).path("/blocking").header_exists("authorization");
		then.status(200).body("blocking body");
	});
	let client = client(&server, "/blocking", |_| {});
	let response = client.send_blocking().expect("Blocking send should succeed.");

	mock.assert();

	assert_eq!(response.body, "blocking body");
}
