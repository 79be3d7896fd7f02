//! Optional observability helpers for send attempts.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth1_client.request` with the `mode`
//!   (sync/async) and `stage` (call site) fields, plus `attempt_id`, `method`, `placement`,
//!   and the settled `state` of the attempt.
//! - Enable `metrics` to increment the `oauth1_client_request_total` counter for every
//!   attempt/success/failure/cancellation, labeled by `mode`, `placement`, and `outcome`, and
//!   to record finished body sizes in `oauth1_client_response_bytes`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, client::AttemptState};

/// How a send attempt delivers its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SendMode {
	/// `send` / `send_blocking`: the caller waits for the whole response.
	Sync,
	/// `send_async` / `send_async_with_delegate`: results are streamed as events.
	Async,
}
impl SendMode {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SendMode::Sync => "sync",
			SendMode::Async => "async",
		}
	}
}
impl Display for SendMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a send method.
	Attempt,
	/// Response fully received.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Attempt cancelled by the caller.
	Cancelled,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
			RequestOutcome::Cancelled => "cancelled",
		}
	}

	/// Maps a settled attempt state to its outcome label; `None` while the attempt is live.
	pub const fn from_state(state: AttemptState) -> Option<Self> {
		match state {
			AttemptState::Completed => Some(RequestOutcome::Success),
			AttemptState::Failed => Some(RequestOutcome::Failure),
			AttemptState::Cancelled => Some(RequestOutcome::Cancelled),
			AttemptState::Idle | AttemptState::Building | AttemptState::Sent => None,
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_follows_settled_state() {
		assert_eq!(RequestOutcome::from_state(AttemptState::Completed), Some(RequestOutcome::Success));
		assert_eq!(RequestOutcome::from_state(AttemptState::Failed), Some(RequestOutcome::Failure));
		assert_eq!(
			RequestOutcome::from_state(AttemptState::Cancelled),
			Some(RequestOutcome::Cancelled)
		);
		assert_eq!(RequestOutcome::from_state(AttemptState::Sent), None);
	}
}
