// self
use crate::{
	_prelude::*,
	client::{AttemptInfo, AttemptState},
	obs::SendMode,
	request::ParamPlacement,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// `oauth1_client.request` span covering one send call.
///
/// The attempt fields (`attempt_id`, `method`, `placement`) are filled in once the
/// connection slot has been claimed; `state` is recorded when the attempt settles.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Opens the span for `mode` at the given call site.
	pub fn new(mode: SendMode, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			use tracing::field::Empty;

			let span = tracing::info_span!(
				"oauth1_client.request",
				mode = mode.as_str(),
				stage,
				attempt_id = Empty,
				method = Empty,
				placement = Empty,
				state = Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (mode, stage);

			Self {}
		}
	}

	/// Tags the span with the attempt it now belongs to.
	pub fn record_attempt(&self, attempt: &AttemptInfo, placement: ParamPlacement) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("attempt_id", attempt.id);
			self.span.record("method", attempt.method.as_str());
			self.span.record("placement", placement.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (attempt, placement);
		}
	}

	/// Records the state the attempt settled in and logs terminal failures.
	pub fn record_state(&self, state: AttemptState) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("state", state.as_str());

			if state == AttemptState::Failed {
				tracing::debug!(parent: &self.span, "request attempt failed");
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = state;
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> RequestSpanGuard {
		#[cfg(feature = "tracing")]
		{
			RequestSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			RequestSpanGuard {}
		}
	}

	/// Instruments a send future without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`RequestSpan::entered`].
pub struct RequestSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for RequestSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RequestSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::Method;
	// self
	use super::*;

	fn attempt() -> AttemptInfo {
		AttemptInfo {
			id: 7,
			method: Method::POST,
			url: Url::parse("https://api.example.com/statuses").expect("Failed to parse test URL."),
		}
	}

	#[test]
	fn span_accepts_attempt_fields_in_every_build() {
		let span = RequestSpan::new(SendMode::Sync, "test");

		span.record_attempt(&attempt(), ParamPlacement::Body);
		span.record_state(AttemptState::Failed);

		let _guard = span.entered();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = RequestSpan::new(SendMode::Async, "instrument_wraps_future");

		span.record_attempt(&attempt(), ParamPlacement::Query);

		let value = span.instrument(async { 42 }).await;

		span.record_state(AttemptState::Completed);

		assert_eq!(value, 42);
	}
}
