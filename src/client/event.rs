//! Streamed delivery of asynchronous attempts.
//!
//! An asynchronous send yields [`RequestEvent`]s in a fixed order:
//!
//! - success: `ResponseReceived`, zero or more `DataReceived`, then `Finished`;
//! - failure: `Failed` at any point, with nothing after it;
//! - cancellation: `Cancelled`, with nothing after it.
//!
//! [`InFlightRequest`] exposes these as a channel-backed [`Stream`]; [`RequestDelegate`]
//! is the callback-style adapter over the same events.

// std
use std::task::{Context, Poll};
// crates.io
use futures::Stream;
use tokio::sync::mpsc::UnboundedReceiver;
// self
use crate::{
	_prelude::*,
	client::{AttemptInfo, AttemptState, CancelHandle, ResponseData, ResponseHead},
	error::TransportError,
};

/// Notification emitted by an asynchronous attempt.
#[derive(Debug)]
pub enum RequestEvent {
	/// Status and headers are known.
	ResponseReceived(ResponseHead),
	/// Next body chunk, in arrival order.
	DataReceived(Bytes),
	/// Terminal: the response was fully received.
	Finished(ResponseData),
	/// Terminal: the exchange failed after it was initiated.
	Failed(RequestFailure),
	/// Terminal: the attempt was cancelled.
	Cancelled,
}
impl RequestEvent {
	/// Returns `true` for `Finished`, `Failed`, and `Cancelled`.
	pub fn is_terminal(&self) -> bool {
		self.terminal_state().is_some()
	}

	pub(crate) fn terminal_state(&self) -> Option<AttemptState> {
		match self {
			Self::ResponseReceived(_) | Self::DataReceived(_) => None,
			Self::Finished(_) => Some(AttemptState::Completed),
			Self::Failed(_) => Some(AttemptState::Failed),
			Self::Cancelled => Some(AttemptState::Cancelled),
		}
	}
}

/// Error plus whatever part of the response arrived before it.
#[derive(Debug)]
pub struct RequestFailure {
	/// What went wrong.
	pub error: Error,
	/// Partial response, present when the failure happened after the head arrived.
	pub response: Option<ResponseData>,
}

/// Terminal result of an asynchronous attempt.
#[derive(Debug)]
pub enum Outcome {
	/// The response was fully received.
	Finished(ResponseData),
	/// The exchange failed.
	Failed(RequestFailure),
	/// The attempt was cancelled.
	Cancelled,
}
impl Outcome {
	/// Returns the response for finished attempts.
	pub fn into_response(self) -> Option<ResponseData> {
		match self {
			Self::Finished(response) => Some(response),
			_ => None,
		}
	}
}

/// Receiving side of an asynchronous attempt.
///
/// Dropping the value does not cancel the attempt; call [`InFlightRequest::cancel`] for that.
#[derive(Debug)]
pub struct InFlightRequest {
	handle: CancelHandle,
	events: UnboundedReceiver<RequestEvent>,
	done: bool,
}
impl InFlightRequest {
	pub(crate) fn new(handle: CancelHandle, events: UnboundedReceiver<RequestEvent>) -> Self {
		Self { handle, events, done: false }
	}

	/// Identity of the attempt.
	pub fn info(&self) -> &AttemptInfo {
		self.handle.info()
	}

	/// Current state of the attempt.
	pub fn state(&self) -> AttemptState {
		self.handle.state()
	}

	/// Cancels the attempt; see [`CancelHandle::cancel`].
	pub fn cancel(&self) -> bool {
		self.handle.cancel()
	}

	/// Returns a handle that can cancel the attempt from elsewhere.
	pub fn cancel_handle(&self) -> CancelHandle {
		self.handle.clone()
	}

	/// Waits for the next event; `None` once the terminal event has been returned.
	///
	/// Once the attempt is cancelled, events queued before the cancellation are dropped and
	/// only `Cancelled` is returned.
	pub async fn next_event(&mut self) -> Option<RequestEvent> {
		while !self.done {
			let event = self.events.recv().await;

			if event.as_ref().is_some_and(|event| self.superseded(event)) {
				continue;
			}

			return self.observe(event);
		}

		None
	}

	/// Drains events until the terminal one and returns it as an [`Outcome`].
	pub async fn outcome(mut self) -> Outcome {
		while let Some(event) = self.next_event().await {
			match event {
				RequestEvent::Finished(response) => return Outcome::Finished(response),
				RequestEvent::Failed(failure) => return Outcome::Failed(failure),
				RequestEvent::Cancelled => return Outcome::Cancelled,
				RequestEvent::ResponseReceived(_) | RequestEvent::DataReceived(_) => {},
			}
		}

		Outcome::Failed(RequestFailure { error: TransportError::Aborted.into(), response: None })
	}

	// Data queued ahead of a cancellation must not reach the caller.
	fn superseded(&self, event: &RequestEvent) -> bool {
		!event.is_terminal() && self.handle.state() == AttemptState::Cancelled
	}

	fn observe(&mut self, event: Option<RequestEvent>) -> Option<RequestEvent> {
		match &event {
			Some(event) if event.is_terminal() => self.done = true,
			None => self.done = true,
			_ => {},
		}

		event
	}
}
impl Stream for InFlightRequest {
	type Item = RequestEvent;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		while !self.done {
			match self.events.poll_recv(cx) {
				Poll::Ready(Some(event)) if self.superseded(&event) => continue,
				Poll::Ready(event) => return Poll::Ready(self.observe(event)),
				Poll::Pending => return Poll::Pending,
			}
		}

		Poll::Ready(None)
	}
}

/// Callback interface for asynchronous attempts; every hook is optional.
///
/// Hooks run on a tokio worker task, not on the thread that started the send, and should
/// return quickly or hand work off.
pub trait RequestDelegate
where
	Self: Send + Sync,
{
	/// Status and headers are known.
	fn did_receive_response(&self, _request: &AttemptInfo, _response: &ResponseHead) {}

	/// A body chunk arrived.
	fn did_receive_data(&self, _request: &AttemptInfo, _chunk: &Bytes) {}

	/// Terminal: the exchange failed.
	fn did_fail_with_error(&self, _request: &AttemptInfo, _failure: &RequestFailure) {}

	/// Terminal: the response was fully received.
	fn did_finish_loading(&self, _request: &AttemptInfo, _response: &ResponseData) {}

	/// Terminal: the attempt was cancelled.
	fn connection_was_cancelled(&self, _request: &AttemptInfo) {}
}

pub(crate) fn dispatch(delegate: &dyn RequestDelegate, request: &AttemptInfo, event: &RequestEvent) {
	match event {
		RequestEvent::ResponseReceived(head) => delegate.did_receive_response(request, head),
		RequestEvent::DataReceived(chunk) => delegate.did_receive_data(request, chunk),
		RequestEvent::Finished(response) => delegate.did_finish_loading(request, response),
		RequestEvent::Failed(failure) => delegate.did_fail_with_error(request, failure),
		RequestEvent::Cancelled => delegate.connection_was_cancelled(request),
	}
}
