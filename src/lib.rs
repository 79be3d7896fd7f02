//! OAuth 1.0a request client: describe a request once, then sign and send it blocking or
//! asynchronously, with streamed events and cancellation for asynchronous attempts.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod oauth;
pub mod obs;
pub mod request;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Scripted transport and fixtures for engine tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use futures::{future, stream};
	use http::StatusCode;
	use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
	// self
	use crate::{
		auth::{Consumer, Token},
		client::RequestClient,
		error::TransportError,
		request::RequestDescriptor,
		transport::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
	};

	/// Feeds body chunks into a [`Script::Streamed`] reply.
	pub type ChunkSender = UnboundedSender<Result<Bytes, TransportError>>;

	/// One scripted transport reply, consumed in order.
	#[derive(Debug)]
	pub enum Script {
		/// Responds immediately with the given status and body chunks.
		Respond {
			/// Response status.
			status: StatusCode,
			/// Body chunks in order.
			chunks: Vec<Bytes>,
		},
		/// Responds immediately; the body follows whatever the paired [`ChunkSender`] pushes
		/// and ends when it is dropped.
		Streamed {
			/// Response status.
			status: StatusCode,
			/// Receiving end of the chunk channel.
			chunks: UnboundedReceiver<Result<Bytes, TransportError>>,
		},
		/// Fails before any response head arrives.
		Refuse,
		/// Never resolves.
		Hang,
	}
	impl Script {
		/// Immediate reply with static body chunks.
		pub fn respond(status: StatusCode, chunks: &[&'static str]) -> Self {
			Self::Respond {
				status,
				chunks: chunks.iter().map(|chunk| Bytes::from_static(chunk.as_bytes())).collect(),
			}
		}

		/// Reply whose body is driven by the returned sender.
		pub fn streamed(status: StatusCode) -> (Self, ChunkSender) {
			let (tx, rx) = mpsc::unbounded_channel();

			(Self::Streamed { status, chunks: rx }, tx)
		}
	}

	/// [`HttpTransport`] that replays [`Script`]s and records every request it was handed.
	///
	/// Once the scripts run out it answers `200 OK` with an empty body.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		scripts: Mutex<VecDeque<Script>>,
		seen: Mutex<Vec<TransportRequest>>,
	}
	impl ScriptedTransport {
		/// Creates a shared transport replaying `scripts`.
		pub fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
			Arc::new(Self { scripts: Mutex::new(scripts.into_iter().collect()), ..Default::default() })
		}

		/// Queues one more reply.
		pub fn push(&self, script: Script) {
			self.scripts.lock().push_back(script);
		}

		/// Requests handed to the transport so far.
		pub fn requests(&self) -> Vec<TransportRequest> {
			self.seen.lock().clone()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
			self.seen.lock().push(request);

			let script = self
				.scripts
				.lock()
				.pop_front()
				.unwrap_or(Script::Respond { status: StatusCode::OK, chunks: Vec::new() });

			Box::pin(async move {
				match script {
					Script::Respond { status, chunks } => Ok(TransportResponse {
						status,
						headers: Default::default(),
						body: Box::pin(stream::iter(chunks.into_iter().map(Ok))),
					}),
					Script::Streamed { status, chunks } => {
						let body = stream::unfold(chunks, |mut chunks| async move {
							chunks.recv().await.map(|chunk| (chunk, chunks))
						});

						Ok(TransportResponse {
							status,
							headers: Default::default(),
							body: Box::pin(body),
						})
					},
					Script::Refuse => Err(TransportError::Io(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						"connection refused",
					))),
					Script::Hang => future::pending().await,
				}
			})
		}
	}

	/// Descriptor for `GET https://api.example.com/resource` with a one-second timeout.
	pub fn test_descriptor() -> RequestDescriptor {
		let mut descriptor = RequestDescriptor::new(
			Url::parse("https://api.example.com/resource").expect("Failed to parse test URL."),
		);

		descriptor.timeout = Duration::seconds(1);

		descriptor
	}

	/// Three-legged client (`ck`/`cs`, `tok`/`ts`) backed by `transport`.
	pub fn test_client(
		transport: Arc<ScriptedTransport>,
		descriptor: RequestDescriptor,
	) -> RequestClient {
		RequestClient::with_transport(
			Consumer::new("ck", "cs"),
			Some(Token::new("tok", "ts")),
			descriptor,
			transport,
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use bytes::Bytes;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
