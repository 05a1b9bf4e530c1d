//! Caller contexts that receive exactly one sign-in outcome.
//!
//! A [`SignInCall`] is consumed by value when it is resolved or rejected, so the type system
//! rules out double completion. Hosts with their own bridge object (a plugin call, a JNI
//! callback) implement the trait directly; async Rust callers use [`channel`].

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::SignInResult};

/// Originating request that is settled once with either a result or an error.
pub trait SignInCall
where
	Self: Send,
{
	/// Settles the call successfully.
	fn resolve(self: Box<Self>, result: SignInResult);

	/// Settles the call with an error.
	fn reject(self: Box<Self>, error: Error);

	/// Settles the call from a [`Result`].
	fn settle(self: Box<Self>, outcome: Result<SignInResult>) {
		match outcome {
			Ok(result) => self.resolve(result),
			Err(error) => self.reject(error),
		}
	}
}

/// Boxed call as stored by handlers and the registry.
pub type BoxedCall = Box<dyn SignInCall>;

/// Creates a oneshot-backed call and the receiver its outcome is delivered to.
pub fn channel() -> (ChannelCall, SignInReceiver) {
	let (tx, rx) = oneshot::channel();

	(ChannelCall(tx), SignInReceiver(rx))
}

/// [`SignInCall`] that forwards its outcome to a [`SignInReceiver`].
#[derive(Debug)]
pub struct ChannelCall(oneshot::Sender<Result<SignInResult>>);
impl ChannelCall {
	/// Boxes the call for handler entry points.
	pub fn boxed(self) -> BoxedCall {
		Box::new(self)
	}
}
impl SignInCall for ChannelCall {
	fn resolve(self: Box<Self>, result: SignInResult) {
		// A dropped receiver means the caller stopped waiting; nothing is left to notify.
		let _ = self.0.send(Ok(result));
	}

	fn reject(self: Box<Self>, error: Error) {
		let _ = self.0.send(Err(error));
	}
}

/// Awaitable side of [`channel`].
#[derive(Debug)]
pub struct SignInReceiver(oneshot::Receiver<Result<SignInResult>>);
impl SignInReceiver {
	/// Waits for the outcome.
	///
	/// A call dropped without being settled surfaces as [`Error::SignInCancelled`].
	pub async fn outcome(self) -> Result<SignInResult> {
		self.0.await.unwrap_or(Err(Error::SignInCancelled))
	}

	/// Returns the outcome if it has already been delivered.
	pub fn try_outcome(&mut self) -> Option<Result<SignInResult>> {
		match self.0.try_recv() {
			Ok(outcome) => Some(outcome),
			Err(oneshot::error::TryRecvError::Empty) => None,
			Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::SignInCancelled)),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn resolved_outcome_is_available_without_awaiting() {
		let (call, mut receiver) = channel();

		assert!(receiver.try_outcome().is_none());

		call.boxed().resolve(SignInResult { user: None, credential: None });

		assert!(matches!(receiver.try_outcome(), Some(Ok(_))));
	}

	#[test]
	fn dropped_calls_read_as_cancelled() {
		let (call, mut receiver) = channel();

		drop(call);

		assert!(matches!(receiver.try_outcome(), Some(Err(Error::SignInCancelled))));
	}

	#[test]
	fn settle_routes_errors_to_reject() {
		let (call, mut receiver) = channel();

		call.boxed().settle(Err(Error::NoCurrentUser));

		assert!(matches!(receiver.try_outcome(), Some(Err(Error::NoCurrentUser))));
	}
}
