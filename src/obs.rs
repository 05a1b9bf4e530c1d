//! Observability helpers for sign-in flows.
//!
//! Every flow runs inside a `tracing` span named `federated_auth.flow` carrying the `flow` and
//! `stage` fields plus the `provider` once it is known. Enable the `metrics` feature to increment
//! the `federated_auth_flow_total` counter for every attempt and outcome, labeled by `flow` +
//! `outcome`, and `federated_auth_exchange_failure_total` labeled by failure `cause`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Provider handler start (`begin_sign_in`).
	BeginSignIn,
	/// Platform result delivered back to a suspended handler.
	Resume,
	/// Backend credential exchange.
	Exchange,
	/// Backend and provider sign-out.
	SignOut,
	/// Id token retrieval or refresh.
	IdToken,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::BeginSignIn => "begin_sign_in",
			FlowKind::Resume => "resume",
			FlowKind::Exchange => "exchange",
			FlowKind::SignOut => "sign_out",
			FlowKind::IdToken => "id_token",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Flow suspended while the platform UI is shown.
	Suspended,
	/// The provider produced a credential and handed it to the backend exchange.
	Credential,
	/// Successful completion.
	Success,
	/// The user abandoned the flow.
	Cancelled,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Suspended => "suspended",
			FlowOutcome::Credential => "credential",
			FlowOutcome::Success => "success",
			FlowOutcome::Cancelled => "cancelled",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Classifies a settled result.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => FlowOutcome::Success,
			Err(err) => Self::of_error(err),
		}
	}

	/// Classifies the error a caller was rejected with.
	pub fn of_error(err: &Error) -> Self {
		if err.is_cancellation() { FlowOutcome::Cancelled } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
