//! Pending-operation registry that parks suspended sign-in calls by continuation token.
//!
//! The registry is the only shared mutable structure of the sign-in core. Each entry is
//! inserted once when a handler hands control to the platform and removed exactly once, either
//! by the matching platform result ([`PendingRegistry::take`]) or by host teardown
//! ([`PendingRegistry::expire`]). Entries for different tokens never contend beyond the map lock,
//! which is held only for the insert/remove itself.

// self
use crate::{
	_prelude::*,
	auth::{ContinuationToken, Provider, TokenSecret},
	call::BoxedCall,
};

/// Handler state that must survive the suspension alongside the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowContext {
	/// Raw nonce whose hash was sent with the request.
	pub raw_nonce: Option<TokenSecret>,
}

/// Suspended sign-in call waiting for its platform result.
pub struct PendingOperation {
	/// Correlation id shared with the platform flow.
	pub token: ContinuationToken,
	/// Provider whose handler started the flow.
	pub provider: Provider,
	/// Originating caller context.
	pub call: BoxedCall,
	/// Handler state captured when the flow started.
	pub context: FlowContext,
}
impl PendingOperation {
	/// Creates a pending operation.
	pub fn new(token: ContinuationToken, provider: Provider, call: BoxedCall) -> Self {
		Self { token, provider, call, context: FlowContext::default() }
	}

	/// Attaches handler state.
	pub fn with_context(mut self, context: FlowContext) -> Self {
		self.context = context;

		self
	}
}
impl Debug for PendingOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingOperation")
			.field("token", &self.token)
			.field("provider", &self.provider)
			.field("context", &self.context)
			.finish_non_exhaustive()
	}
}

/// Thread-safe map of suspended operations keyed by continuation token.
#[derive(Debug, Default)]
pub struct PendingRegistry(Mutex<HashMap<ContinuationToken, PendingOperation>>);
impl PendingRegistry {
	/// Parks `operation` until its platform result arrives.
	///
	/// A token that is still pending is a programming error. The existing entry is left
	/// untouched and the rejected operation is handed back so its caller can be notified.
	pub fn register(&self, operation: PendingOperation) -> Result<(), (Error, PendingOperation)> {
		let mut pending = self.0.lock();

		if pending.contains_key(&operation.token) {
			let error = Error::DuplicatePendingOperation { token: operation.token.to_string() };

			return Err((error, operation));
		}

		pending.insert(operation.token.clone(), operation);

		Ok(())
	}

	/// Consumes the operation registered under `token`.
	pub fn take(&self, token: &str) -> Result<PendingOperation> {
		self.0
			.lock()
			.remove(token)
			.ok_or_else(|| Error::UnknownContinuation { token: token.to_owned() })
	}

	/// Discards the operation under `token` and rejects its caller with
	/// [`Error::SignInCancelled`].
	pub fn expire(&self, token: &str) -> Result<()> {
		let operation = self.take(token)?;

		operation.call.reject(Error::SignInCancelled);

		Ok(())
	}

	/// Expires every pending operation, returning how many were cancelled.
	pub fn expire_all(&self) -> usize {
		let drained = self.0.lock().drain().map(|(_, operation)| operation).collect::<Vec<_>>();
		let count = drained.len();

		for operation in drained {
			operation.call.reject(Error::SignInCancelled);
		}

		count
	}

	/// Returns `true` when an operation is pending under `token`.
	pub fn contains(&self, token: &str) -> bool {
		self.0.lock().contains_key(token)
	}

	/// Number of pending operations.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when nothing is pending.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}
}
