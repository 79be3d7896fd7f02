//! Transport primitives for signed requests.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. The engine hands it a
//! fully built [`TransportRequest`] and expects a [`TransportResponse`] whose body arrives as
//! a stream of chunks, which is what lets asynchronous sends report data incrementally and
//! stop reading as soon as an attempt is cancelled.

pub mod build;
pub mod user_agent;

pub use build::*;
pub use user_agent::*;

// crates.io
use futures::Stream;
#[cfg(feature = "reqwest")] use futures::StreamExt;
use http::{HeaderMap, Method, StatusCode};
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Streamed response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;
/// Future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a signed request.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by
/// clients and moved into the tasks that drive asynchronous sends. The returned future
/// resolves once status and headers are known; the body is read afterwards through
/// [`TransportResponse::body`]. Dropping the future or the body stream must abort the
/// underlying connection.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` and resolves with the response head plus a body stream.
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Transport-level request produced from a signed OAuth request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Final URL, including any query-placed parameters.
	pub url: Url,
	/// Final header set.
	pub headers: HeaderMap,
	/// Body bytes, if any.
	pub body: Option<Bytes>,
	/// Deadline the transport should enforce.
	pub timeout: Duration,
}

/// Response head plus streamed body returned by a transport.
pub struct TransportResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Body chunks in arrival order.
	pub body: BodyStream,
}
impl Debug for TransportResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransportResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.finish_non_exhaustive()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Signed requests should not follow redirects: the signature covers the original URL and
/// would be rejected by the redirect target. [`ReqwestTransport::try_new`] disables them;
/// configure any custom [`ReqwestClient`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn try_new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(request.method, request.url).headers(request.headers);

			if let Ok(timeout) = std::time::Duration::try_from(request.timeout) {
				builder = builder.timeout(timeout);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes_stream().map(|chunk| chunk.map_err(TransportError::from));

			Ok(TransportResponse { status, headers, body: Box::pin(body) })
		})
	}
}
