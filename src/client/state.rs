//! Per-attempt state machine and the single-connection slot.
//!
//! Every send runs as one attempt:
//!
//! ```text
//! Idle -> Building -> Sent -> Completed
//!            |          |---> Failed
//!            |          `---> Cancelled
//!            `---> Failed
//! ```
//!
//! State changes and event emission share the attempt mutex, so once the state has left
//! `Sent` no further event can be queued for that attempt.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use http::Method;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
// self
use crate::{_prelude::*, client::RequestEvent};

/// Lifecycle states of one send attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttemptState {
	/// Nothing has happened yet.
	Idle,
	/// Signing and transport request construction are underway.
	Building,
	/// The transport call has been issued.
	Sent,
	/// The full response was delivered.
	Completed,
	/// Building or the exchange failed.
	Failed,
	/// The caller cancelled the exchange.
	Cancelled,
}
impl AttemptState {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AttemptState::Idle => "idle",
			AttemptState::Building => "building",
			AttemptState::Sent => "sent",
			AttemptState::Completed => "completed",
			AttemptState::Failed => "failed",
			AttemptState::Cancelled => "cancelled",
		}
	}

	/// Returns `true` for `Completed`, `Failed`, and `Cancelled`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, AttemptState::Completed | AttemptState::Failed | AttemptState::Cancelled)
	}

	/// Returns `true` while the attempt owns the client's connection slot.
	pub const fn is_live(self) -> bool {
		matches!(self, AttemptState::Building | AttemptState::Sent)
	}

	/// Checks whether `next` is a legal successor.
	pub const fn can_transition_to(self, next: AttemptState) -> bool {
		matches!(
			(self, next),
			(AttemptState::Idle, AttemptState::Building)
				| (AttemptState::Building, AttemptState::Sent)
				| (AttemptState::Building, AttemptState::Failed)
				| (AttemptState::Sent, AttemptState::Completed)
				| (AttemptState::Sent, AttemptState::Failed)
				| (AttemptState::Sent, AttemptState::Cancelled)
		)
	}
}
impl Display for AttemptState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Raised when the state machine refuses a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Attempt cannot move from {from} to {to}.")]
pub struct InvalidTransition {
	/// State the attempt was in.
	pub from: AttemptState,
	/// Requested state.
	pub to: AttemptState,
}

/// Identifies the request a notification belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptInfo {
	/// Per-client sequence number, starting at 1.
	pub id: u64,
	/// Signed HTTP method.
	pub method: Method,
	/// Target URL before placement.
	pub url: Url,
}

/// Cloneable handle that cancels one asynchronous attempt.
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<Attempt>);
impl CancelHandle {
	pub(crate) fn new(attempt: Arc<Attempt>) -> Self {
		Self(attempt)
	}

	/// Cancels the attempt if it is still `Sent`.
	///
	/// Returns `true` only for the call that performed the cancellation; repeated calls and
	/// calls after a terminal event are no-ops.
	pub fn cancel(&self) -> bool {
		self.0.cancel()
	}

	/// Current state of the attempt.
	pub fn state(&self) -> AttemptState {
		self.0.state()
	}

	/// Identity of the attempt.
	pub fn info(&self) -> &AttemptInfo {
		self.0.info()
	}
}

pub(crate) struct Attempt {
	info: AttemptInfo,
	cancellable: bool,
	inner: Mutex<AttemptInner>,
	token: CancellationToken,
}
impl Attempt {
	fn new(info: AttemptInfo, cancellable: bool) -> Self {
		Self {
			info,
			cancellable,
			inner: Mutex::new(AttemptInner { state: AttemptState::Idle, events: None }),
			token: CancellationToken::new(),
		}
	}

	pub(crate) fn info(&self) -> &AttemptInfo {
		&self.info
	}

	pub(crate) fn state(&self) -> AttemptState {
		self.inner.lock().state
	}

	pub(crate) fn transition(&self, next: AttemptState) -> Result<(), InvalidTransition> {
		let mut inner = self.inner.lock();

		inner.advance(next)
	}

	/// Moves `Building -> Sent`, installing the event channel for streamed attempts.
	pub(crate) fn start(
		&self,
		events: Option<UnboundedSender<RequestEvent>>,
	) -> Result<(), InvalidTransition> {
		let mut inner = self.inner.lock();

		inner.advance(AttemptState::Sent)?;
		inner.events = events;

		Ok(())
	}

	/// Queues `event` if the attempt is still `Sent`; terminal events close the attempt.
	///
	/// Returns `false` when the event was suppressed.
	pub(crate) fn emit(&self, event: RequestEvent) -> bool {
		let mut inner = self.inner.lock();

		if inner.state != AttemptState::Sent {
			return false;
		}
		if let Some(next) = event.terminal_state() {
			inner.state = next;
		}
		if let Some(events) = &inner.events {
			// A dropped receiver only means nobody is listening anymore.
			let _ = events.send(event);
		}
		if inner.state.is_terminal() {
			inner.events = None;
		}

		true
	}

	pub(crate) fn cancel(&self) -> bool {
		if !self.cancellable {
			return false;
		}

		let mut inner = self.inner.lock();

		if inner.advance(AttemptState::Cancelled).is_err() {
			return false;
		}
		if let Some(events) = inner.events.take() {
			let _ = events.send(RequestEvent::Cancelled);
		}

		drop(inner);
		self.token.cancel();

		true
	}

	/// Fails an attempt whose driver went away before it reached a terminal state.
	pub(crate) fn abandon(&self) {
		let mut inner = self.inner.lock();

		if inner.state.is_live() {
			inner.state = AttemptState::Failed;
			inner.events = None;
		}
	}

	pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
		self.token.cancelled()
	}
}
impl Debug for Attempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Attempt")
			.field("info", &self.info)
			.field("state", &self.state())
			.field("cancellable", &self.cancellable)
			.finish()
	}
}

struct AttemptInner {
	state: AttemptState,
	events: Option<UnboundedSender<RequestEvent>>,
}
impl AttemptInner {
	fn advance(&mut self, next: AttemptState) -> Result<(), InvalidTransition> {
		if !self.state.can_transition_to(next) {
			return Err(InvalidTransition { from: self.state, to: next });
		}

		self.state = next;

		Ok(())
	}
}

/// Holds the client's most recent attempt; a new one may start once it is no longer live.
#[derive(Debug, Default)]
pub(crate) struct ConnectionSlot {
	current: Mutex<Option<Arc<Attempt>>>,
	next_id: AtomicU64,
}
impl ConnectionSlot {
	/// Claims the slot for a new attempt in `Building`, or fails with
	/// [`Error::Busy`] while another attempt is live.
	pub(crate) fn acquire(
		&self,
		method: Method,
		url: Url,
		cancellable: bool,
	) -> Result<Arc<Attempt>> {
		let mut current = self.current.lock();

		if current.as_ref().is_some_and(|attempt| attempt.state().is_live()) {
			return Err(Error::Busy);
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
		let attempt = Arc::new(Attempt::new(AttemptInfo { id, method, url }, cancellable));

		attempt.transition(AttemptState::Building)?;
		*current = Some(Arc::clone(&attempt));

		Ok(attempt)
	}

	pub(crate) fn current(&self) -> Option<Arc<Attempt>> {
		self.current.lock().clone()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::sync::mpsc;
	// self
	use super::*;
	use crate::client::ResponseData;

	fn slot_attempt(slot: &ConnectionSlot) -> Arc<Attempt> {
		slot.acquire(
			Method::GET,
			Url::parse("https://api.example.com/").expect("Failed to parse test URL."),
			true,
		)
		.expect("Slot should be free.")
	}

	#[test]
	fn transition_table_matches_lifecycle() {
		use AttemptState::*;

		assert!(Idle.can_transition_to(Building));
		assert!(Building.can_transition_to(Failed));
		assert!(Sent.can_transition_to(Cancelled));
		assert!(!Idle.can_transition_to(Sent));
		assert!(!Completed.can_transition_to(Cancelled));
		assert!(!Cancelled.can_transition_to(Completed));
		assert!([Completed, Failed, Cancelled].iter().all(|state| state.is_terminal()));
		assert!(![Idle, Building, Sent].iter().any(|state| state.is_terminal()));
	}

	#[test]
	fn slot_rejects_second_live_attempt() {
		let slot = ConnectionSlot::default();
		let first = slot_attempt(&slot);

		assert_eq!(first.info().id, 1);
		assert!(matches!(
			slot.acquire(first.info().method.clone(), first.info().url.clone(), true),
			Err(Error::Busy)
		));

		first.transition(AttemptState::Failed).expect("Building may fail.");

		let second = slot_attempt(&slot);

		assert_eq!(second.info().id, 2);
		assert_eq!(first.state(), AttemptState::Failed);
		assert!(slot.current().is_some_and(|held| Arc::ptr_eq(&held, &second)));
	}

	#[test]
	fn cancel_is_idempotent_and_suppresses_events() {
		let slot = ConnectionSlot::default();
		let attempt = slot_attempt(&slot);
		let (tx, mut rx) = mpsc::unbounded_channel();

		assert!(!attempt.cancel(), "Cancelling before Sent must be a no-op.");

		attempt.start(Some(tx)).expect("Building may move to Sent.");

		assert!(attempt.cancel());
		assert!(!attempt.cancel());
		assert!(!attempt.emit(RequestEvent::DataReceived(Bytes::from_static(b"late"))));
		assert_eq!(attempt.state(), AttemptState::Cancelled);
		assert!(matches!(rx.try_recv(), Ok(RequestEvent::Cancelled)));
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn completion_wins_over_late_cancel() {
		let slot = ConnectionSlot::default();
		let attempt = slot_attempt(&slot);

		attempt.start(None).expect("Building may move to Sent.");

		let finished = RequestEvent::Finished(ResponseData {
			status: http::StatusCode::OK,
			headers: http::HeaderMap::new(),
			body: Bytes::new(),
		});

		assert!(attempt.emit(finished));
		assert!(!attempt.cancel());
		assert_eq!(attempt.state(), AttemptState::Completed);
	}

	#[test]
	fn abandon_frees_the_slot() {
		let slot = ConnectionSlot::default();
		let attempt = slot_attempt(&slot);
		let (tx, mut rx) = mpsc::unbounded_channel();

		attempt.start(Some(tx)).expect("Building may move to Sent.");
		attempt.abandon();

		assert_eq!(attempt.state(), AttemptState::Failed);
		assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));

		slot_attempt(&slot);
	}

	#[test]
	fn synchronous_attempts_ignore_cancel() {
		let slot = ConnectionSlot::default();
		let attempt = slot
			.acquire(
				Method::GET,
				Url::parse("https://api.example.com/").expect("Failed to parse test URL."),
				false,
			)
			.expect("Slot should be free.");

		attempt.start(None).expect("Building may move to Sent.");

		assert!(!attempt.cancel());
		assert_eq!(attempt.state(), AttemptState::Sent);
	}
}
