//! Native one-tap handler for Google.

// self
use crate::{
	_prelude::*,
	auth::{ContinuationToken, Provider, ProviderCredential, Scopes},
	call::BoxedCall,
	config::AuthConfig,
	platform::{OneTapRequest, PlatformLauncher, PlatformRequest, PlatformResult, PlatformTokens},
	provider::{HandlerEnv, HandlerStep},
	registry::{FlowContext, PendingOperation},
};

/// Long-lived one-tap client reused across sign-in attempts.
///
/// It remembers the last credential the backend accepted so a repeated sign-in on the same
/// account does not show the picker again. A rejected credential is never replayed.
#[derive(Debug)]
pub struct OneTapClient {
	request: OneTapRequest,
	accepted: Mutex<Option<ProviderCredential>>,
}
impl OneTapClient {
	/// Creates a client minting id tokens for `server_client_id`.
	pub fn new(server_client_id: Option<String>, scopes: Scopes) -> Self {
		Self { request: OneTapRequest { server_client_id, scopes }, accepted: Default::default() }
	}

	/// Request handed to the platform credential manager.
	pub fn request(&self) -> &OneTapRequest {
		&self.request
	}

	/// Last credential the backend accepted, if any.
	pub fn cached_credential(&self) -> Option<ProviderCredential> {
		self.accepted.lock().clone()
	}

	fn remember(&self, credential: &ProviderCredential) {
		*self.accepted.lock() = Some(credential.clone());
	}

	fn forget(&self) {
		self.accepted.lock().take();
	}
}

/// Handler for Google's native credential UI.
#[derive(Debug)]
pub struct OneTapHandler {
	server_client_id: Option<String>,
	scopes: Scopes,
	client: Mutex<Option<Arc<OneTapClient>>>,
}
impl OneTapHandler {
	/// Creates a handler from the Google section of the configuration.
	pub fn new(config: &AuthConfig) -> Self {
		Self {
			server_client_id: config.google.server_client_id.clone(),
			scopes: config.provider_options(Provider::Google).scopes,
			client: Default::default(),
		}
	}

	/// Returns the cached client, building it on first use.
	pub fn client(&self) -> Arc<OneTapClient> {
		self.client
			.lock()
			.get_or_insert_with(|| {
				Arc::new(OneTapClient::new(self.server_client_id.clone(), self.scopes.clone()))
			})
			.clone()
	}

	/// Returns `true` while a client is cached.
	pub fn has_client(&self) -> bool {
		self.client.lock().is_some()
	}

	/// Resolves from a silent or cached credential when one exists, otherwise opens the picker.
	pub fn begin_sign_in(
		&self,
		env: HandlerEnv<'_>,
		token: ContinuationToken,
		call: BoxedCall,
	) -> HandlerStep {
		let client = self.client();

		if let Some(tokens) = env.launcher.silent_one_tap(client.request()) {
			tracing::debug!("Resolving one-tap sign-in from a silent credential.");

			return complete(call, tokens);
		}
		if let Some(credential) = client.cached_credential() {
			tracing::debug!("Resolving one-tap sign-in from the cached credential.");

			return HandlerStep::Credential { call, credential };
		}

		let request = PlatformRequest::OneTap(client.request().clone());

		super::suspend(env, token, Provider::Google, call, FlowContext::default(), request)
	}

	/// Turns the picker result into a Google credential.
	pub fn handle_platform_result(
		&self,
		operation: PendingOperation,
		result: PlatformResult,
	) -> HandlerStep {
		match result {
			PlatformResult::Completed(tokens) => complete(operation.call, tokens),
			other => super::resolve_platform_result(Provider::Google, operation.call, other, None),
		}
	}

	/// Caches an accepted credential for the next attempt, or drops a rejected one.
	///
	/// A sign-out during the exchange already dropped the client, so nothing is cached then.
	pub fn credential_settled(&self, credential: &ProviderCredential, accepted: bool) {
		let Some(client) = self.client.lock().clone() else {
			return;
		};

		if accepted {
			client.remember(credential);
		} else {
			tracing::debug!("Dropping the one-tap credential the backend rejected.");
			client.forget();
		}
	}

	/// Drops the cached client and signs the device out of the one-tap account.
	///
	/// Platform errors are logged and otherwise ignored.
	pub fn sign_out(&self, launcher: &dyn PlatformLauncher) {
		self.client.lock().take();

		if let Err(err) = launcher.sign_out_one_tap() {
			tracing::warn!(error = %err, "One-tap sign-out failed.");
		}
	}
}

fn complete(call: BoxedCall, tokens: PlatformTokens) -> HandlerStep {
	super::resolve_platform_result(Provider::Google, call, PlatformResult::Completed(tokens), None)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{call, platform::PlatformError, registry::PendingRegistry};

	#[derive(Default)]
	struct PickerLauncher {
		launched: Mutex<Vec<PlatformRequest>>,
		silent: Option<PlatformTokens>,
		sign_out_error: Option<PlatformError>,
	}
	impl PlatformLauncher for PickerLauncher {
		fn launch(&self, _: &ContinuationToken, request: PlatformRequest) -> Result<(), PlatformError> {
			self.launched.lock().push(request);

			Ok(())
		}

		fn silent_one_tap(&self, _: &OneTapRequest) -> Option<PlatformTokens> {
			self.silent.clone()
		}

		fn sign_out_one_tap(&self) -> Result<(), PlatformError> {
			self.sign_out_error.clone().map_or(Ok(()), Err)
		}
	}

	fn config() -> AuthConfig {
		AuthConfig::default().with_server_client_id("1234.apps.googleusercontent.com")
	}

	#[test]
	fn client_is_built_once_and_reused() {
		let handler = OneTapHandler::new(&config());
		let first = handler.client();
		let second = handler.client();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(
			first.request().server_client_id.as_deref(),
			Some("1234.apps.googleusercontent.com")
		);
	}

	#[test]
	fn picker_opens_when_no_credential_is_cached() {
		let handler = OneTapHandler::new(&config());
		let launcher = PickerLauncher::default();
		let registry = PendingRegistry::default();
		let env = HandlerEnv { registry: &registry, launcher: &launcher, language_code: None };
		let token = ContinuationToken::generate();
		let (call, _receiver) = call::channel();
		let step = handler.begin_sign_in(env, token.clone(), call.boxed());

		assert!(matches!(step, HandlerStep::Suspended));
		assert!(registry.contains(&token));
		assert!(matches!(launcher.launched.lock().as_slice(), [PlatformRequest::OneTap(_)]));

		let operation = registry.take(&token).expect("Operation should be pending.");
		let HandlerStep::Credential { credential, .. } = handler.handle_platform_result(
			operation,
			PlatformResult::Completed(PlatformTokens::id_token("google-id-token")),
		) else {
			panic!("Picker results with a token should produce a credential.");
		};

		// Nothing is cached until the backend accepts the credential.
		assert!(handler.client().cached_credential().is_none());

		handler.credential_settled(&credential, true);

		let (call, _receiver) = call::channel();
		let step = handler.begin_sign_in(env, ContinuationToken::generate(), call.boxed());

		assert!(matches!(step, HandlerStep::Credential { .. }));
		assert_eq!(launcher.launched.lock().len(), 1);
	}

	#[test]
	fn rejected_credentials_are_not_replayed() {
		let handler = OneTapHandler::new(&config());
		let launcher = PickerLauncher::default();
		let registry = PendingRegistry::default();
		let env = HandlerEnv { registry: &registry, launcher: &launcher, language_code: None };
		let credential = ProviderCredential::builder(Provider::Google).id_token("expired").build();

		handler.client();
		handler.credential_settled(&credential, true);

		assert!(handler.client().cached_credential().is_some());

		handler.credential_settled(&credential, false);

		let (call, _receiver) = call::channel();
		let step = handler.begin_sign_in(env, ContinuationToken::generate(), call.boxed());

		assert!(matches!(step, HandlerStep::Suspended));
		assert!(matches!(launcher.launched.lock().as_slice(), [PlatformRequest::OneTap(_)]));
	}

	#[test]
	fn silent_credentials_skip_the_picker() {
		let handler = OneTapHandler::new(&config());
		let launcher = PickerLauncher {
			silent: Some(PlatformTokens::id_token("silent-id-token")),
			..Default::default()
		};
		let registry = PendingRegistry::default();
		let env = HandlerEnv { registry: &registry, launcher: &launcher, language_code: None };
		let (call, _receiver) = call::channel();
		let HandlerStep::Credential { credential, .. } =
			handler.begin_sign_in(env, ContinuationToken::generate(), call.boxed())
		else {
			panic!("Silent credentials should resolve without UI.");
		};

		assert_eq!(credential.provider(), Provider::Google);
		assert!(registry.is_empty());
		assert!(launcher.launched.lock().is_empty());
	}

	#[test]
	fn sign_out_drops_the_client_even_when_the_platform_fails() {
		let handler = OneTapHandler::new(&config());
		let launcher = PickerLauncher {
			sign_out_error: Some(PlatformError::new("Credential manager unavailable.")),
			..Default::default()
		};
		let credential = ProviderCredential::builder(Provider::Google).id_token("cached").build();

		handler.client();
		handler.credential_settled(&credential, true);
		handler.sign_out(&launcher);

		assert!(!handler.has_client());

		// An exchange finishing after the sign-out must not resurrect the account.
		handler.credential_settled(&credential, true);

		assert!(!handler.has_client());
		assert!(handler.client().cached_credential().is_none());
	}
}
