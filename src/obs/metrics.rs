// self
use crate::{
	error::ExchangeFailure,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"federated_auth_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a failed backend exchange by cause. Callers only ever see the constant failure
/// message, so this counter is where rejections and outages can be told apart.
pub fn record_exchange_failure(cause: ExchangeFailure) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("federated_auth_exchange_failure_total", "cause" => cause.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = cause;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_is_safe_without_a_recorder() {
		record_flow_outcome(FlowKind::Exchange, FlowOutcome::Failure);
		record_flow_outcome(FlowKind::BeginSignIn, FlowOutcome::Credential);
		record_exchange_failure(ExchangeFailure::Rejected);
	}
}
