//! Request client that signs, sends, and cancels one request at a time.
//!
//! [`RequestClient`] owns immutable [`Credentials`] and a mutable [`RequestDescriptor`].
//! Every send clones the descriptor, signs it with a fresh nonce and timestamp, and claims
//! the client's single connection slot; a second send while one is live fails with
//! [`Error::Busy`]. Descriptor edits made while an attempt is live are deferred to the next
//! send because the live attempt works from its own snapshot.
//!
//! Two delivery styles are available:
//!
//! - [`RequestClient::send`] and [`RequestClient::send_blocking`] return the finalized
//!   [`ResponseData`], bounded by [`RequestDescriptor::timeout`];
//! - [`RequestClient::send_async`] and [`RequestClient::send_async_with_delegate`] return
//!   once the exchange has been initiated and stream [`RequestEvent`]s afterwards. Only
//!   these attempts can be cancelled.

pub mod event;
pub mod response;
pub mod state;

pub use event::*;
pub use response::*;
pub use state::*;

// crates.io
use futures::StreamExt;
use tokio::{runtime::Handle, sync::mpsc, time::Instant};
// self
use crate::{
	_prelude::*,
	auth::{Consumer, Credentials, Token},
	error::{BuildError, ConfigError, TransportError},
	oauth::{HmacSha1Signer, ProtocolSeed, SignedRequest, Signer, sign_request},
	obs::{self, RequestOutcome, RequestSpan, SendMode},
	request::{ParamPlacement, RequestDescriptor},
	transport::{
		HttpTransport, TransportRequest, TransportResponse, build_transport_request,
		default_user_agent,
	},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

// Stand-in deadline for timeouts too large to schedule.
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Signs and executes requests described by a [`RequestDescriptor`].
///
/// All send methods take `&self`; the client is `Send + Sync` and can be shared behind an
/// [`Arc`]. Mutating the descriptor needs `&mut self` and never affects a live attempt.
pub struct RequestClient {
	credentials: Credentials,
	descriptor: RequestDescriptor,
	signer: Arc<dyn Signer>,
	transport: Arc<dyn HttpTransport>,
	user_agent: String,
	slot: Arc<ConnectionSlot>,
}
impl RequestClient {
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		consumer: Consumer,
		token: Option<Token>,
		descriptor: RequestDescriptor,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		Self {
			credentials: Credentials::new(consumer, token),
			descriptor,
			signer: Arc::new(HmacSha1Signer),
			transport,
			user_agent: default_user_agent(),
			slot: Default::default(),
		}
	}

	/// Replaces the signature method (defaults to [`HmacSha1Signer`]).
	pub fn with_signer(mut self, signer: impl 'static + Signer) -> Self {
		self.signer = Arc::new(signer);

		self
	}

	/// Replaces the client-wide user-agent (defaults to [`default_user_agent`]).
	///
	/// A descriptor-level override still wins.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Credentials used for every request.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Current descriptor.
	pub fn descriptor(&self) -> &RequestDescriptor {
		&self.descriptor
	}

	/// Mutable access to the descriptor; changes apply from the next send on.
	pub fn descriptor_mut(&mut self) -> &mut RequestDescriptor {
		&mut self.descriptor
	}

	/// Replaces the descriptor; applies from the next send on.
	pub fn set_descriptor(&mut self, descriptor: RequestDescriptor) {
		self.descriptor = descriptor;
	}

	/// State of the most recent attempt, or `Idle` before the first send.
	pub fn state(&self) -> AttemptState {
		self.slot.current().map(|attempt| attempt.state()).unwrap_or(AttemptState::Idle)
	}

	/// Returns `true` while an attempt is live.
	pub fn is_busy(&self) -> bool {
		self.state().is_live()
	}

	/// Signs the current descriptor with a fresh nonce and timestamp.
	pub fn build_signed_request(&self) -> Result<SignedRequest> {
		self.sign(&self.descriptor)
	}

	/// Builds the exact transport request a send would issue right now, without sending it.
	pub fn build_transport_request(&self) -> Result<TransportRequest> {
		self.build(&self.descriptor)
	}

	/// Sends the request and waits for the whole response.
	///
	/// Fails with [`Error::Timeout`] once [`RequestDescriptor::timeout`] elapses.
	pub async fn send(&self) -> Result<ResponseData> {
		const MODE: SendMode = SendMode::Sync;

		let placement = self.descriptor.placement;
		let span = RequestSpan::new(MODE, "send");

		obs::record_request_outcome(MODE, placement, RequestOutcome::Attempt);

		let result = span
			.instrument(async {
				let (attempt, request) = self.prepare(false)?;
				let _settle = AbandonOnDrop(&attempt);

				span.record_attempt(attempt.info(), placement);

				let result = match attempt.start(None) {
					Ok(()) => collect(self.transport.as_ref(), request).await,
					Err(e) => Err(e.into()),
				};
				let terminal =
					if result.is_ok() { AttemptState::Completed } else { AttemptState::Failed };

				attempt.transition(terminal)?;
				span.record_state(terminal);

				result
			})
			.await;

		match &result {
			Ok(response) => {
				obs::record_response_bytes(MODE, response.body.len());
				obs::record_request_outcome(MODE, placement, RequestOutcome::Success);
			},
			Err(_) => obs::record_request_outcome(MODE, placement, RequestOutcome::Failure),
		}

		result
	}

	/// Blocks the calling thread until [`RequestClient::send`] resolves.
	///
	/// Runs on a private current-thread runtime, so it must not be called from a thread
	/// that is already driving a tokio runtime.
	pub fn send_blocking(&self) -> Result<ResponseData> {
		if Handle::try_current().is_ok() {
			return Err(ConfigError::BlockingInsideRuntime.into());
		}

		let _guard = RequestSpan::new(SendMode::Sync, "send_blocking").entered();
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(ConfigError::RuntimeBuild)?;

		runtime.block_on(self.send())
	}

	/// Initiates the request and returns as soon as the exchange has been started.
	///
	/// Build failures and [`Error::Busy`] are returned here; everything after initiation
	/// arrives through the returned [`InFlightRequest`]. Must be called from within a tokio
	/// runtime; the exchange runs on that runtime.
	pub fn send_async(&self) -> Result<InFlightRequest> {
		const MODE: SendMode = SendMode::Async;

		let runtime = Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;
		let placement = self.descriptor.placement;

		obs::record_request_outcome(MODE, placement, RequestOutcome::Attempt);

		let started = self.start_async(&runtime, placement);

		if started.is_err() {
			obs::record_request_outcome(MODE, placement, RequestOutcome::Failure);
		}

		started
	}

	/// Initiates the request and forwards its events to `delegate`.
	///
	/// Notifications run on a runtime worker task in event order. The returned handle
	/// cancels the attempt, as does [`RequestClient::cancel`].
	pub fn send_async_with_delegate(
		&self,
		delegate: Arc<dyn RequestDelegate>,
	) -> Result<CancelHandle> {
		let runtime = Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;
		let mut in_flight = self.send_async()?;
		let handle = in_flight.cancel_handle();

		runtime.spawn(async move {
			let request = in_flight.info().clone();

			while let Some(event) = in_flight.next_event().await {
				event::dispatch(delegate.as_ref(), &request, &event);
			}
		});

		Ok(handle)
	}

	/// Cancels the live asynchronous attempt, if any.
	///
	/// Idempotent: returns `false` when nothing was cancelled (no attempt, a blocking
	/// attempt, or an attempt that already reached a terminal state).
	pub fn cancel(&self) -> bool {
		self.slot.current().is_some_and(|attempt| attempt.cancel())
	}

	fn start_async(&self, runtime: &Handle, placement: ParamPlacement) -> Result<InFlightRequest> {
		let (attempt, request) = self.prepare(true)?;
		let (tx, rx) = mpsc::unbounded_channel();

		attempt.start(Some(tx))?;

		let span = RequestSpan::new(SendMode::Async, "send_async");

		span.record_attempt(attempt.info(), placement);
		runtime.spawn(span.instrument(drive(
			Arc::clone(&self.transport),
			Arc::clone(&attempt),
			request,
			span.clone(),
			placement,
		)));

		Ok(InFlightRequest::new(CancelHandle::new(attempt), rx))
	}

	/// Claims the slot and builds the transport request from a descriptor snapshot.
	fn prepare(&self, cancellable: bool) -> Result<(Arc<Attempt>, TransportRequest)> {
		let snapshot = self.descriptor.clone();
		let attempt =
			self.slot.acquire(snapshot.method.clone(), snapshot.url.clone(), cancellable)?;

		match self.build(&snapshot) {
			Ok(request) => Ok((attempt, request)),
			Err(e) => {
				attempt.transition(AttemptState::Failed)?;

				Err(e)
			},
		}
	}

	fn sign(&self, descriptor: &RequestDescriptor) -> Result<SignedRequest> {
		descriptor.validate().map_err(BuildError::from)?;

		Ok(sign_request(
			&self.credentials,
			descriptor,
			self.signer.as_ref(),
			ProtocolSeed::generate(),
		)?)
	}

	fn build(&self, descriptor: &RequestDescriptor) -> Result<TransportRequest> {
		let signed = self.sign(descriptor)?;

		Ok(build_transport_request(&signed, descriptor, &self.user_agent)?)
	}
}
#[cfg(feature = "reqwest")]
impl RequestClient {
	/// Creates a client backed by a default [`ReqwestTransport`].
	pub fn new(consumer: Consumer, token: Option<Token>, descriptor: RequestDescriptor) -> Self {
		Self::with_transport(consumer, token, descriptor, Arc::new(ReqwestTransport::default()))
	}
}
impl Debug for RequestClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("consumer_key", &self.credentials.consumer.key)
			.field("two_legged", &self.credentials.is_two_legged())
			.field("signature_method", &self.signer.method())
			.field("descriptor", &self.descriptor)
			.field("state", &self.state())
			.finish()
	}
}

// Fails the attempt if its send future is dropped mid-flight.
struct AbandonOnDrop<'a>(&'a Attempt);
impl Drop for AbandonOnDrop<'_> {
	fn drop(&mut self) {
		self.0.abandon();
	}
}

/// Runs a whole exchange for blocking and awaited sends.
async fn collect(transport: &dyn HttpTransport, request: TransportRequest) -> Result<ResponseData> {
	let timeout = request.timeout;
	let exchange = async move {
		let response =
			transport.execute(request).await.map_err(|e| Error::from_transport(e, timeout))?;
		let mut aggregator = ResponseAggregator::new(ResponseHead {
			status: response.status,
			headers: response.headers,
		});
		let mut body = response.body;

		while let Some(chunk) = body.next().await {
			aggregator.append(&chunk.map_err(|e| Error::from_transport(e, timeout))?);
		}

		Ok(aggregator.finish())
	};

	tokio::time::timeout_at(deadline(timeout), exchange)
		.await
		.map_err(|_| Error::Timeout { after: timeout })?
}

fn deadline(timeout: Duration) -> Instant {
	let now = Instant::now();

	std::time::Duration::try_from(timeout)
		.ok()
		.and_then(|timeout| now.checked_add(timeout))
		.unwrap_or_else(|| now + std::time::Duration::from_secs(FAR_FUTURE_SECS))
}

/// Runs an asynchronous exchange, emitting events until a terminal one or cancellation.
async fn drive(
	transport: Arc<dyn HttpTransport>,
	attempt: Arc<Attempt>,
	request: TransportRequest,
	span: RequestSpan,
	placement: ParamPlacement,
) {
	let _settle = AbandonOnDrop(&attempt);
	let timeout = request.timeout;
	let deadline = deadline(timeout);
	let response = tokio::select! {
		biased;
		_ = attempt.cancelled() => return settle_async(&attempt, &span, placement),
		_ = tokio::time::sleep_until(deadline) => Err(TransportError::TimedOut),
		response = transport.execute(request) => response,
	};

	match response {
		Ok(response) => stream_body(&attempt, response, timeout, deadline).await,
		Err(e) => {
			attempt.emit(RequestEvent::Failed(RequestFailure {
				error: Error::from_transport(e, timeout),
				response: None,
			}));
		},
	}

	settle_async(&attempt, &span, placement);
}

fn settle_async(attempt: &Attempt, span: &RequestSpan, placement: ParamPlacement) {
	let state = attempt.state();

	span.record_state(state);

	if let Some(outcome) = RequestOutcome::from_state(state) {
		obs::record_request_outcome(SendMode::Async, placement, outcome);
	}
}

async fn stream_body(
	attempt: &Attempt,
	response: TransportResponse,
	timeout: Duration,
	deadline: Instant,
) {
	let head = ResponseHead { status: response.status, headers: response.headers };

	if !attempt.emit(RequestEvent::ResponseReceived(head.clone())) {
		return;
	}

	let mut aggregator = ResponseAggregator::new(head);
	let mut body = response.body;

	loop {
		let next = tokio::select! {
			biased;
			_ = attempt.cancelled() => return,
			_ = tokio::time::sleep_until(deadline) => Some(Err(TransportError::TimedOut)),
			next = body.next() => next,
		};

		match next {
			Some(Ok(chunk)) => {
				aggregator.append(&chunk);

				if !attempt.emit(RequestEvent::DataReceived(chunk)) {
					return;
				}
			},
			Some(Err(e)) => {
				attempt.emit(RequestEvent::Failed(RequestFailure {
					error: Error::from_transport(e, timeout),
					response: Some(aggregator.finish()),
				}));

				return;
			},
			None => {
				let response = aggregator.finish();
				let len = response.body.len();

				if attempt.emit(RequestEvent::Finished(response)) {
					obs::record_response_bytes(SendMode::Async, len);
				}

				return;
			},
		}
	}
}
