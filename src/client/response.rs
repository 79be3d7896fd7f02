//! Response head, finalized response, and the aggregator that joins streamed chunks.

// std
use std::str::Utf8Error;
// crates.io
use bytes::BytesMut;
use http::{HeaderMap, StatusCode};
// self
use crate::_prelude::*;

/// Status and headers captured when a response starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHead {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
}

/// Finalized response of one attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseData {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Complete body in arrival order.
	pub body: Bytes,
}
impl ResponseData {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Borrows the body as UTF-8 text.
	pub fn text(&self) -> Result<&str, Utf8Error> {
		std::str::from_utf8(&self.body)
	}
}

/// Accumulates body chunks behind a captured [`ResponseHead`].
#[derive(Debug)]
pub struct ResponseAggregator {
	head: ResponseHead,
	body: BytesMut,
}
impl ResponseAggregator {
	/// Starts aggregating for the provided head.
	pub fn new(head: ResponseHead) -> Self {
		Self { head, body: BytesMut::new() }
	}

	/// Appends the next chunk.
	pub fn append(&mut self, chunk: &[u8]) {
		self.body.extend_from_slice(chunk);
	}

	/// Number of body bytes received so far.
	pub fn len(&self) -> usize {
		self.body.len()
	}

	/// Returns `true` while no body bytes have arrived.
	pub fn is_empty(&self) -> bool {
		self.body.is_empty()
	}

	/// Finalizes the response.
	pub fn finish(self) -> ResponseData {
		ResponseData { status: self.head.status, headers: self.head.headers, body: self.body.freeze() }
	}
}
