//! Client-level error types shared across signing, request building, and execution.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The signed request could not be built.
	#[error(transparent)]
	Build(#[from] BuildError),
	/// Local configuration problem (runtime, HTTP client).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Attempt state machine refused a transition.
	#[error(transparent)]
	State(#[from] crate::client::InvalidTransition),

	/// No response arrived within the configured timeout.
	#[error("Request timed out after {after}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Another request is already in flight on this client.
	#[error("A request is already in flight on this client.")]
	Busy,
}

/// Failures raised while turning a descriptor into a signed transport request.
#[derive(Debug, ThisError)]
pub enum BuildError {
	/// Descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::request::DescriptorError),
	/// Consumer key is empty.
	#[error("Consumer credential is missing.")]
	MissingCredential,
	/// Signer refused to produce a signature.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Body placement was requested while raw body bytes are already set.
	#[error("OAuth parameters cannot be placed in the body because a raw body is already set.")]
	ConflictingBody,
	/// Caller parameters must not use the `oauth_` namespace.
	#[error("Parameter `{name}` is reserved for the OAuth protocol.")]
	ReservedParameter {
		/// Offending parameter name.
		name: String,
	},
	/// Header name or value cannot be represented on the wire.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
}

/// Errors reported by [`Signer`](crate::oauth::Signer) implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SigningError {
	/// Signature method is not supported by the signer.
	#[error("Signature method `{method}` is not supported.")]
	UnsupportedMethod {
		/// Requested signature method.
		method: String,
	},
	/// Key material was rejected.
	#[error("Signing key was rejected: {reason}.")]
	InvalidKey {
		/// Signer-supplied reason string.
		reason: String,
	},
}

/// Configuration failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Asynchronous sends need an ambient tokio runtime.
	#[error("Asynchronous sends must be started from within a tokio runtime.")]
	MissingRuntime,
	/// Blocking sends cannot run on a thread that is already driving a tokio runtime.
	#[error("Blocking sends cannot be issued from within a tokio runtime; use `send` instead.")]
	BlockingInsideRuntime,
	/// The private runtime used by blocking sends could not be started.
	#[error("Blocking runtime could not be started.")]
	RuntimeBuild(#[source] std::io::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
	/// The transport enforced its own deadline.
	#[error("Transport deadline elapsed.")]
	TimedOut,
	/// The exchange ended without reporting a terminal outcome.
	#[error("Exchange ended before a terminal event was delivered.")]
	Aborted,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::TimedOut } else { Self::network(e) }
	}
}

impl Error {
	/// Maps a transport failure, folding transport deadlines into [`Error::Timeout`].
	pub(crate) fn from_transport(err: TransportError, timeout: Duration) -> Self {
		match err {
			TransportError::TimedOut => Self::Timeout { after: timeout },
			other => Self::Transport(other),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn transport_deadline_becomes_timeout() {
		let err = Error::from_transport(TransportError::TimedOut, Duration::seconds(5));

		assert!(matches!(err, Error::Timeout { after } if after == Duration::seconds(5)));

		let err = Error::from_transport(
			TransportError::Io(std::io::Error::other("reset")),
			Duration::seconds(5),
		);

		assert!(matches!(err, Error::Transport(TransportError::Io(_))));
	}

	#[test]
	fn signing_errors_nest_under_build() {
		let err: Error =
			BuildError::from(SigningError::UnsupportedMethod { method: "RSA-SHA1".into() }).into();

		assert_eq!(err.to_string(), "Signature method `RSA-SHA1` is not supported.");
	}
}
