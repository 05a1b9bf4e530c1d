//! Inbound sign-in surface wiring handlers, the registry, and the session together.

// self
use crate::{
	_prelude::*,
	auth::{ContinuationToken, Provider, UserSnapshot},
	backend::IdentityBackend,
	call::BoxedCall,
	config::AuthConfig,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	platform::{PlatformLauncher, PlatformResult},
	provider::{HandlerEnv, HandlerStep, ProviderHandler},
	registry::PendingRegistry,
	session::{AuthSession, SessionOrchestrator},
};
#[cfg(feature = "reqwest")] use crate::backend::RestBackend;

/// Where a sign-in call stands once the entry point returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInProgress {
	/// The platform UI is showing; report its outcome under `token`.
	Suspended {
		/// Continuation token the platform result must carry.
		token: ContinuationToken,
	},
	/// The call has already been resolved or rejected.
	Settled,
}
impl SignInProgress {
	/// Continuation token of a suspended call.
	pub fn token(&self) -> Option<&ContinuationToken> {
		match self {
			Self::Suspended { token } => Some(token),
			Self::Settled => None,
		}
	}
}

/// Coordinates federated sign-in for every supported provider.
///
/// The authenticator owns one handler per provider and the registry of suspended calls. The
/// identity backend and the platform launcher are injected so hosts decide which session and
/// which UI implementation back the flows. Every sign-in call is settled exactly once: either
/// before the entry point returns, or when the host reports the matching platform result (or
/// tears the flow down through [`Authenticator::expire`]).
pub struct Authenticator {
	handlers: [ProviderHandler; Provider::ALL.len()],
	registry: PendingRegistry,
	orchestrator: SessionOrchestrator,
	launcher: Arc<dyn PlatformLauncher>,
}
impl Authenticator {
	/// Creates an authenticator and applies the configured language to the backend session.
	pub fn new(
		config: AuthConfig,
		backend: Arc<dyn IdentityBackend>,
		launcher: Arc<dyn PlatformLauncher>,
	) -> Self {
		if let Some(code) = &config.language_code {
			backend.set_language_code(Some(code.clone()));
		}

		let handlers = Provider::ALL.map(|provider| ProviderHandler::for_provider(provider, &config));
		let orchestrator =
			SessionOrchestrator::new(AuthSession::new(backend), config.skip_native_auth);

		Self { handlers, registry: PendingRegistry::default(), orchestrator, launcher }
	}

	#[cfg(feature = "reqwest")]
	/// Creates an authenticator backed by the Identity Toolkit REST API.
	pub fn with_rest_backend(config: AuthConfig, launcher: Arc<dyn PlatformLauncher>) -> Result<Self> {
		let backend = RestBackend::new(&config.backend)?;

		Ok(Self::new(config, Arc::new(backend), launcher))
	}

	/// Starts a sign-in with `provider`, correlating any platform flow through `token`.
	pub async fn sign_in(
		&self,
		provider: Provider,
		token: ContinuationToken,
		call: BoxedCall,
	) -> SignInProgress {
		const KIND: FlowKind = FlowKind::BeginSignIn;

		let span = FlowSpan::new(KIND, "sign_in");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		span.record_provider(provider);
		span.instrument(async move {
			tracing::debug!(%provider, "Starting sign-in.");

			let language = self.orchestrator.session().language_code();
			let env = HandlerEnv {
				registry: &self.registry,
				launcher: self.launcher.as_ref(),
				language_code: language.as_deref(),
			};
			let step = self.handler(provider).begin_sign_in(env, token.clone(), call);

			self.drive(KIND, step, token).await
		})
		.await
	}

	/// Signs in with Apple using a generated continuation token.
	pub async fn sign_in_with_apple(&self, call: BoxedCall) -> SignInProgress {
		self.sign_in(Provider::Apple, ContinuationToken::generate(), call).await
	}

	/// Signs in with GitHub using a generated continuation token.
	pub async fn sign_in_with_github(&self, call: BoxedCall) -> SignInProgress {
		self.sign_in(Provider::Github, ContinuationToken::generate(), call).await
	}

	/// Signs in with Google one-tap using a generated continuation token.
	pub async fn sign_in_with_google(&self, call: BoxedCall) -> SignInProgress {
		self.sign_in(Provider::Google, ContinuationToken::generate(), call).await
	}

	/// Signs in with Microsoft using a generated continuation token.
	pub async fn sign_in_with_microsoft(&self, call: BoxedCall) -> SignInProgress {
		self.sign_in(Provider::Microsoft, ContinuationToken::generate(), call).await
	}

	/// Signs in with Twitter using a generated continuation token.
	pub async fn sign_in_with_twitter(&self, call: BoxedCall) -> SignInProgress {
		self.sign_in(Provider::Twitter, ContinuationToken::generate(), call).await
	}

	/// Signs in with Yahoo using a generated continuation token.
	pub async fn sign_in_with_yahoo(&self, call: BoxedCall) -> SignInProgress {
		self.sign_in(Provider::Yahoo, ContinuationToken::generate(), call).await
	}

	/// Resumes the call suspended under `token` with the platform's outcome.
	///
	/// Returns [`Error::UnknownContinuation`] when nothing is pending under `token`, for example
	/// because the result was already delivered or the flow expired.
	pub async fn handle_platform_result(&self, token: &str, result: PlatformResult) -> Result<()> {
		const KIND: FlowKind = FlowKind::Resume;

		let span = FlowSpan::new(KIND, "handle_platform_result");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let operation = span.in_scope(|| {
			self.registry.take(token).inspect_err(|_| {
				tracing::warn!("Platform result arrived for an unknown continuation token.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			})
		})?;

		span.record_provider(operation.provider);
		span.instrument(async move {
			let token = operation.token.clone();
			let step = self.handler(operation.provider).handle_platform_result(operation, result);

			self.drive(KIND, step, token).await;
		})
		.await;

		Ok(())
	}

	/// Tears down the flow suspended under `token`, rejecting its caller as cancelled.
	pub fn expire(&self, token: &str) -> Result<()> {
		self.registry.expire(token)?;

		tracing::debug!("Pending sign-in expired.");
		obs::record_flow_outcome(FlowKind::Resume, FlowOutcome::Cancelled);

		Ok(())
	}

	/// Tears down every suspended flow, returning how many callers were cancelled.
	pub fn expire_all(&self) -> usize {
		let expired = self.registry.expire_all();

		for _ in 0..expired {
			obs::record_flow_outcome(FlowKind::Resume, FlowOutcome::Cancelled);
		}

		expired
	}

	/// Signs out of the backend session and resets provider-local state.
	///
	/// Always succeeds; provider reset failures are only logged.
	pub fn sign_out(&self) {
		self.orchestrator.complete_sign_out();

		for handler in &self.handlers {
			handler.sign_out(self.launcher.as_ref());
		}
	}

	/// Returns the current user's id token. See [`AuthSession::get_id_token`].
	pub async fn get_id_token(&self, force_refresh: bool) -> Result<String> {
		self.orchestrator.session().get_id_token(force_refresh).await
	}

	/// Overrides the session language.
	pub fn set_language_code(&self, code: impl Into<String>) {
		self.orchestrator.session().set_language_code(code);
	}

	/// Resets the session language to the application's language.
	pub fn use_app_language(&self) {
		self.orchestrator.session().use_app_language();
	}

	/// Current session language.
	pub fn language_code(&self) -> Option<String> {
		self.orchestrator.session().language_code()
	}

	/// Snapshot of the signed-in user, if any.
	pub fn current_user(&self) -> Option<UserSnapshot> {
		self.orchestrator.session().current_user()
	}

	/// Session accessor.
	pub fn session(&self) -> &AuthSession {
		self.orchestrator.session()
	}

	/// Handler serving `provider`.
	pub fn handler(&self, provider: Provider) -> &ProviderHandler {
		&self.handlers[provider as usize]
	}

	/// Returns `true` while a call is suspended under `token`.
	pub fn is_pending(&self, token: &str) -> bool {
		self.registry.contains(token)
	}

	/// Number of suspended calls.
	pub fn pending_operations(&self) -> usize {
		self.registry.len()
	}

	/// Records what the handler did and hands credentials to the session orchestrator, whose
	/// verdict is reported back to the handler that produced them.
	async fn drive(
		&self,
		kind: FlowKind,
		step: HandlerStep,
		token: ContinuationToken,
	) -> SignInProgress {
		match step {
			HandlerStep::Suspended => {
				obs::record_flow_outcome(kind, FlowOutcome::Suspended);

				SignInProgress::Suspended { token }
			},
			HandlerStep::Credential { call, credential } => {
				obs::record_flow_outcome(kind, FlowOutcome::Credential);

				let accepted = self.orchestrator.complete_sign_in(call, &credential).await;

				self.handler(credential.provider()).credential_settled(&credential, accepted);

				SignInProgress::Settled
			},
			HandlerStep::Settled { outcome } => {
				obs::record_flow_outcome(kind, outcome);

				SignInProgress::Settled
			},
		}
	}
}
impl Debug for Authenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authenticator")
			.field("handlers", &self.handlers)
			.field("registry", &self.registry)
			.field("orchestrator", &self.orchestrator)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		backend::MemoryBackend,
		call,
		platform::{PlatformError, PlatformRequest},
	};

	struct NullLauncher;
	impl PlatformLauncher for NullLauncher {
		fn launch(&self, _: &ContinuationToken, _: PlatformRequest) -> Result<(), PlatformError> {
			Ok(())
		}
	}

	#[test]
	fn handlers_are_indexed_by_provider() {
		let authenticator = Authenticator::new(
			AuthConfig::default(),
			Arc::new(MemoryBackend::default()),
			Arc::new(NullLauncher),
		);

		for provider in Provider::ALL {
			assert_eq!(authenticator.handler(provider).provider(), provider);
		}
	}

	#[test]
	fn configured_language_reaches_the_backend() {
		let backend = MemoryBackend::default();
		let authenticator = Authenticator::new(
			AuthConfig::default().with_language_code("ja"),
			Arc::new(backend.clone()),
			Arc::new(NullLauncher),
		);

		assert_eq!(backend.language_code().as_deref(), Some("ja"));

		authenticator.set_language_code("ko");

		assert_eq!(authenticator.language_code().as_deref(), Some("ko"));
	}

	#[tokio::test]
	async fn expire_rejects_only_the_matching_call() {
		let authenticator = Authenticator::new(
			AuthConfig::default(),
			Arc::new(MemoryBackend::default()),
			Arc::new(NullLauncher),
		);
		let (first, first_rx) = call::channel();
		let (second, mut second_rx) = call::channel();
		let first_token = authenticator
			.sign_in_with_github(first.boxed())
			.await
			.token()
			.cloned()
			.expect("GitHub sign-in should suspend.");
		let second_token = authenticator
			.sign_in_with_twitter(second.boxed())
			.await
			.token()
			.cloned()
			.expect("Twitter sign-in should suspend.");

		authenticator.expire(&first_token).expect("Expiring a pending token should succeed.");

		assert!(matches!(first_rx.outcome().await, Err(Error::SignInCancelled)));
		assert!(second_rx.try_outcome().is_none());
		assert!(authenticator.is_pending(&second_token));
		assert_eq!(authenticator.expire_all(), 1);
	}
}
