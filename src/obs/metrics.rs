// self
use crate::{
	obs::{RequestOutcome, SendMode},
	request::ParamPlacement,
};

/// Counts a send outcome as `oauth1_client_request_total{mode, placement, outcome}`.
pub fn record_request_outcome(mode: SendMode, placement: ParamPlacement, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth1_client_request_total",
			"mode" => mode.as_str(),
			"placement" => placement.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (mode, placement, outcome);
	}
}

/// Records the size of a fully received body in `oauth1_client_response_bytes{mode}`.
pub fn record_response_bytes(mode: SendMode, len: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("oauth1_client_response_bytes", "mode" => mode.as_str())
			.record(len as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (mode, len);
	}
}
