//! Session orchestration: backend-exchange policy, sign-out, and the session accessor.
//!
//! [`SessionOrchestrator`] settles callers once a provider produced a credential. With
//! `skip_native_auth` the credential is returned as-is; otherwise it is exchanged with the
//! identity backend exactly once and any backend failure collapses into
//! [`Error::SignInFailed`], whose detail only reaches the logs. [`AuthSession`] exposes the
//! backend session (current user, id tokens, language) without any sign-in machinery.

// self
use crate::{
	_prelude::*,
	auth::{ProviderCredential, SignInResult, UserSnapshot},
	backend::{BackendError, IdentityBackend},
	call::BoxedCall,
	normalize,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Read-mostly view over the backend session.
#[derive(Clone)]
pub struct AuthSession {
	backend: Arc<dyn IdentityBackend>,
}
impl AuthSession {
	/// Wraps an injected backend handle.
	pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
		Self { backend }
	}

	/// Backend handle shared with the orchestrator.
	pub fn backend(&self) -> &Arc<dyn IdentityBackend> {
		&self.backend
	}

	/// Snapshot of the signed-in user, if any.
	pub fn current_user(&self) -> Option<UserSnapshot> {
		self.backend.current_user()
	}

	/// Returns the current user's id token, refreshing it when forced or stale.
	///
	/// Fails with [`Error::NoCurrentUser`] without touching the network when nobody is signed
	/// in, and with [`Error::TokenRefreshFailed`] carrying the backend message otherwise.
	pub async fn get_id_token(&self, force_refresh: bool) -> Result<String> {
		const KIND: FlowKind = FlowKind::IdToken;

		let span = FlowSpan::new(KIND, "get_id_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if self.backend.current_user().is_none() {
					return Err(Error::NoCurrentUser);
				}

				self.backend.id_token(force_refresh).await.map_err(|err| match err {
					BackendError::NoCurrentUser => Error::NoCurrentUser,
					err => Error::TokenRefreshFailed { message: err.to_string() },
				})
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Language code used by the backend and provider UIs.
	pub fn language_code(&self) -> Option<String> {
		self.backend.language_code()
	}

	/// Overrides the language code.
	pub fn set_language_code(&self, code: impl Into<String>) {
		self.backend.set_language_code(Some(code.into()));
	}

	/// Resets the language code to the application's language.
	pub fn use_app_language(&self) {
		self.backend.use_app_language();
	}
}
impl Debug for AuthSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthSession")
			.field("signed_in", &self.backend.current_user().is_some())
			.finish_non_exhaustive()
	}
}

/// Applies the backend-exchange policy and settles callers.
#[derive(Clone, Debug)]
pub struct SessionOrchestrator {
	session: AuthSession,
	skip_native_auth: bool,
}
impl SessionOrchestrator {
	/// Creates an orchestrator over `session`.
	pub fn new(session: AuthSession, skip_native_auth: bool) -> Self {
		Self { session, skip_native_auth }
	}

	/// Session accessor shared with the orchestrator.
	pub fn session(&self) -> &AuthSession {
		&self.session
	}

	/// Returns `true` when credentials are returned without a backend exchange.
	pub fn skips_native_auth(&self) -> bool {
		self.skip_native_auth
	}

	/// Settles `call` with the credential, exchanging it with the backend unless skipped.
	///
	/// Returns `true` when the caller was resolved, `false` when it was rejected.
	pub async fn complete_sign_in(&self, call: BoxedCall, credential: &ProviderCredential) -> bool {
		let result = self.exchange(credential).await;
		let accepted = result.is_ok();

		call.settle(result);

		accepted
	}

	/// Produces the sign-in result for `credential` without settling any caller.
	pub async fn exchange(&self, credential: &ProviderCredential) -> Result<SignInResult> {
		const KIND: FlowKind = FlowKind::Exchange;

		let provider = credential.provider();
		let normalized = normalize::normalize(credential);

		if self.skip_native_auth {
			tracing::debug!(%provider, "Returning the provider credential without a backend exchange.");
			obs::record_flow_outcome(KIND, FlowOutcome::Success);

			return Ok(SignInResult { user: None, credential: Some(normalized) });
		}

		let span = FlowSpan::new(KIND, "sign_in_with_credential");

		span.record_provider(provider);
		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let backend = self.session.backend();
				let user = backend.sign_in_with_credential(credential).await.map_err(|err| {
					let cause = err.exchange_failure();

					tracing::warn!(%provider, %cause, error = %err, "Backend credential exchange failed.");
					obs::record_exchange_failure(cause);

					Error::SignInFailed { cause }
				})?;
				// The session's current user wins over the exchange response.
				let user = backend.current_user().unwrap_or(user);

				Ok(SignInResult { user: Some(user), credential: Some(normalized) })
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Signs the backend session out. Provider-local state is reset by the caller.
	pub fn complete_sign_out(&self) {
		const KIND: FlowKind = FlowKind::SignOut;

		FlowSpan::new(KIND, "complete_sign_out").in_scope(|| {
			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
			self.session.backend().sign_out();
			obs::record_flow_outcome(KIND, FlowOutcome::Success);
		});
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::Provider, backend::MemoryBackend, call, error::ExchangeFailure};

	fn orchestrator(skip_native_auth: bool) -> (SessionOrchestrator, MemoryBackend) {
		let backend = MemoryBackend::default();
		let session = AuthSession::new(Arc::new(backend.clone()));

		(SessionOrchestrator::new(session, skip_native_auth), backend)
	}

	fn credential(provider: Provider) -> ProviderCredential {
		ProviderCredential::builder(provider).id_token("provider-id-token").build()
	}

	#[tokio::test]
	async fn skip_policy_returns_the_credential_without_backend_calls() {
		let (orchestrator, backend) = orchestrator(true);
		let (call, receiver) = call::channel();

		assert!(orchestrator.complete_sign_in(call.boxed(), &credential(Provider::Microsoft)).await);

		let result = receiver.outcome().await.expect("Skipped exchanges should resolve.");

		assert!(result.user.is_none());
		assert_eq!(
			result.credential.map(|credential| credential.provider_id).as_deref(),
			Some("microsoft.com")
		);
		assert_eq!(backend.sign_in_calls(), 0);
	}

	#[tokio::test]
	async fn exchange_populates_user_and_credential() {
		let (orchestrator, backend) = orchestrator(false);
		let result = orchestrator
			.exchange(&credential(Provider::Yahoo))
			.await
			.expect("Exchange should succeed.");

		assert_eq!(result.user.map(|user| user.uid), backend.current_user().map(|user| user.uid));
		assert!(result.credential.is_some());
		assert_eq!(backend.sign_in_calls(), 1);
	}

	#[tokio::test]
	async fn backend_failures_keep_the_fixed_message() {
		let (orchestrator, backend) = orchestrator(false);

		backend.reject_sign_ins("INVALID_IDP_RESPONSE : Unable to verify the ID Token.");

		let rejected = orchestrator
			.exchange(&credential(Provider::Github))
			.await
			.expect_err("Rejected exchanges should fail.");

		backend.heal();
		backend.break_sign_ins("connection reset");

		let exception = orchestrator
			.exchange(&credential(Provider::Github))
			.await
			.expect_err("Broken exchanges should fail.");

		assert!(matches!(rejected, Error::SignInFailed { cause: ExchangeFailure::Rejected }));
		assert!(matches!(exception, Error::SignInFailed { cause: ExchangeFailure::Exception }));
		assert_eq!(rejected.to_string(), "signIn failed.");
		assert_eq!(exception.to_string(), "signIn failed.");
	}

	#[tokio::test]
	async fn rejected_exchanges_report_the_caller_as_rejected() {
		let (orchestrator, backend) = orchestrator(false);
		let (call, receiver) = call::channel();

		backend.reject_sign_ins("INVALID_IDP_RESPONSE");

		assert!(!orchestrator.complete_sign_in(call.boxed(), &credential(Provider::Google)).await);
		assert!(matches!(receiver.outcome().await, Err(Error::SignInFailed { .. })));
	}

	#[tokio::test]
	async fn id_tokens_require_a_user_and_surface_refresh_messages() {
		let (orchestrator, backend) = orchestrator(false);
		let session = orchestrator.session();

		assert!(matches!(session.get_id_token(false).await, Err(Error::NoCurrentUser)));
		assert_eq!(backend.refresh_calls(), 0);

		orchestrator.exchange(&credential(Provider::Apple)).await.expect("Exchange should succeed.");
		backend.reject_refreshes("TOKEN_EXPIRED");

		assert!(matches!(
			session.get_id_token(true).await,
			Err(Error::TokenRefreshFailed { message }) if message == "TOKEN_EXPIRED"
		));

		orchestrator.complete_sign_out();

		assert!(session.current_user().is_none());
	}
}
