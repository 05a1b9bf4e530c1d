// crates.io
use tracing::{Span, field::Empty, instrument::Instrumented};
// self
use crate::{_prelude::*, auth::Provider, obs::FlowKind};

/// Span wrapping one sign-in stage, tagged with the flow kind and, once known, the provider.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self {
			span: tracing::info_span!(
				"federated_auth.flow",
				flow = kind.as_str(),
				stage,
				provider = Empty
			),
		}
	}

	/// Tags the span with the provider serving the flow.
	pub fn record_provider(&self, provider: Provider) -> &Self {
		self.span.record("provider", provider.id());

		self
	}

	/// Runs a synchronous section inside the span.
	pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
		self.span.in_scope(f)
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		tracing::Instrument::instrument(fut, self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn in_scope_returns_the_section_value() {
		let span = FlowSpan::new(FlowKind::SignOut, "in_scope_returns_the_section_value");

		assert_eq!(span.record_provider(Provider::Google).in_scope(|| 7), 7);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::IdToken, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
