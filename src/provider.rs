//! Provider handlers that start platform flows and turn their results into credentials.
//!
//! Every supported provider is served by one of two handlers behind the tagged
//! [`ProviderHandler`] enum: [`OAuthHandler`] drives a redirect flow in the platform browser for
//! any provider, and [`OneTapHandler`] drives Google's native credential UI. Handlers never
//! contact the identity backend. They either park the caller in the [`PendingRegistry`] while
//! the platform UI is shown, hand a credential back for the session orchestrator, or reject the
//! caller directly when the platform flow itself fails.

pub mod oauth;
pub mod one_tap;

pub use oauth::*;
pub use one_tap::*;

// self
use crate::{
	_prelude::*,
	auth::{ContinuationToken, Provider, ProviderCredential, TokenSecret},
	call::BoxedCall,
	config::AuthConfig,
	platform::{PlatformLauncher, PlatformRequest, PlatformResult, PlatformTokens},
	obs::FlowOutcome,
	registry::{FlowContext, PendingOperation, PendingRegistry},
};

/// Collaborators a handler borrows for the duration of one step.
#[derive(Clone, Copy)]
pub struct HandlerEnv<'a> {
	/// Registry suspended callers are parked in.
	pub registry: &'a PendingRegistry,
	/// Host platform UI launcher.
	pub launcher: &'a dyn PlatformLauncher,
	/// Current session language forwarded to provider UIs.
	pub language_code: Option<&'a str>,
}
impl Debug for HandlerEnv<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HandlerEnv")
			.field("pending", &self.registry.len())
			.field("language_code", &self.language_code)
			.finish_non_exhaustive()
	}
}

/// What a handler did with the caller it was given.
pub enum HandlerStep {
	/// The caller is parked under its continuation token until the platform result arrives.
	Suspended,
	/// A credential is available; the caller must be completed by the session orchestrator.
	Credential {
		/// Originating caller.
		call: BoxedCall,
		/// Credential produced by the provider.
		credential: ProviderCredential,
	},
	/// The caller was already rejected (cancellation or provider failure).
	Settled {
		/// How the rejection is reported to observability.
		outcome: FlowOutcome,
	},
}
impl Debug for HandlerStep {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Suspended => f.write_str("Suspended"),
			Self::Credential { credential, .. } =>
				f.debug_struct("Credential").field("credential", credential).finish_non_exhaustive(),
			Self::Settled { outcome } => f.debug_struct("Settled").field("outcome", outcome).finish(),
		}
	}
}

/// Tagged union over the handler kinds.
#[derive(Debug)]
pub enum ProviderHandler {
	/// Browser redirect flow.
	OAuth(OAuthHandler),
	/// Native one-tap flow.
	OneTap(OneTapHandler),
}
impl ProviderHandler {
	/// Builds the handler serving `provider` from the configuration.
	pub fn for_provider(provider: Provider, config: &AuthConfig) -> Self {
		if provider.is_one_tap() {
			Self::OneTap(OneTapHandler::new(config))
		} else {
			Self::OAuth(OAuthHandler::new(provider, config.provider_options(provider)))
		}
	}

	/// Provider served by this handler.
	pub fn provider(&self) -> Provider {
		match self {
			Self::OAuth(handler) => handler.provider(),
			Self::OneTap(_) => Provider::Google,
		}
	}

	/// Starts the provider flow for `call` under `token`.
	pub fn begin_sign_in(
		&self,
		env: HandlerEnv<'_>,
		token: ContinuationToken,
		call: BoxedCall,
	) -> HandlerStep {
		match self {
			Self::OAuth(handler) => handler.begin_sign_in(env, token, call),
			Self::OneTap(handler) => handler.begin_sign_in(env, token, call),
		}
	}

	/// Converts the platform result for a consumed pending operation.
	pub fn handle_platform_result(
		&self,
		operation: PendingOperation,
		result: PlatformResult,
	) -> HandlerStep {
		match self {
			Self::OAuth(handler) => handler.handle_platform_result(operation, result),
			Self::OneTap(handler) => handler.handle_platform_result(operation, result),
		}
	}

	/// Informs the handler whether the backend accepted a credential it produced.
	pub fn credential_settled(&self, credential: &ProviderCredential, accepted: bool) {
		match self {
			Self::OAuth(_) => {},
			Self::OneTap(handler) => handler.credential_settled(credential, accepted),
		}
	}

	/// Drops provider-local state after a backend sign-out.
	pub fn sign_out(&self, launcher: &dyn PlatformLauncher) {
		match self {
			Self::OAuth(_) => {},
			Self::OneTap(handler) => handler.sign_out(launcher),
		}
	}
}

/// Parks `call` under `token` and launches `request`.
///
/// A launch failure takes the entry back out and rejects the caller with the platform message.
fn suspend(
	env: HandlerEnv<'_>,
	token: ContinuationToken,
	provider: Provider,
	call: BoxedCall,
	context: FlowContext,
	request: PlatformRequest,
) -> HandlerStep {
	let operation = PendingOperation::new(token.clone(), provider, call).with_context(context);

	if let Err((err, rejected)) = env.registry.register(operation) {
		tracing::warn!(%provider, "Continuation token is already pending.");

		return reject(rejected.call, err);
	}
	if let Err(err) = env.launcher.launch(&token, request) {
		// The platform may have reported a result before failing; only reject what is still ours.
		return match env.registry.take(&token) {
			Ok(operation) => reject(operation.call, Error::provider_failed(err.message)),
			Err(_) => HandlerStep::Settled { outcome: FlowOutcome::Failure },
		};
	}

	tracing::debug!(%provider, "Platform flow started.");

	HandlerStep::Suspended
}

/// Settles a platform result into a credential or a rejected caller.
fn resolve_platform_result(
	provider: Provider,
	call: BoxedCall,
	result: PlatformResult,
	raw_nonce: Option<TokenSecret>,
) -> HandlerStep {
	match result {
		PlatformResult::Completed(tokens) => match credential_from_tokens(provider, tokens, raw_nonce) {
			Ok(credential) => HandlerStep::Credential { call, credential },
			Err(err) => reject(call, err),
		},
		PlatformResult::Cancelled => {
			tracing::debug!(%provider, "Platform flow cancelled by the user.");

			reject(call, Error::SignInCancelled)
		},
		PlatformResult::Failed { message } => reject(call, Error::provider_failed(message)),
	}
}

fn reject(call: BoxedCall, err: Error) -> HandlerStep {
	let outcome = FlowOutcome::of_error(&err);

	call.reject(err);

	HandlerStep::Settled { outcome }
}

fn credential_from_tokens(
	provider: Provider,
	tokens: PlatformTokens,
	raw_nonce: Option<TokenSecret>,
) -> Result<ProviderCredential> {
	let mut builder = ProviderCredential::builder(provider);

	if let Some(token) = tokens.id_token {
		builder = builder.id_token(token);
	}
	if let Some(token) = tokens.access_token {
		builder = builder.access_token(token);
	}
	if let Some(secret) = tokens.secret {
		builder = builder.secret(secret);
	}
	if let Some(nonce) = raw_nonce {
		builder = builder.raw_nonce(nonce.expose());
	}

	let credential = builder.build();

	if !credential.has_token() {
		return Err(Error::provider_failed(format!("{provider} returned no credential.")));
	}

	Ok(credential)
}
