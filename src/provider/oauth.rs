//! Redirect-based OAuth handler shared by every browser provider.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	auth::{ContinuationToken, Provider, TokenSecret},
	call::BoxedCall,
	config::ProviderOptions,
	platform::{OAuthRequest, PlatformRequest, PlatformResult},
	provider::{HandlerEnv, HandlerStep},
	registry::{FlowContext, PendingOperation},
};

const RAW_NONCE_LEN: usize = 32;

/// Handler that sends the user through the provider's OAuth consent in the platform browser.
#[derive(Clone, Debug)]
pub struct OAuthHandler {
	provider: Provider,
	options: ProviderOptions,
}
impl OAuthHandler {
	/// Creates a handler for `provider` with its configured scopes and parameters.
	pub fn new(provider: Provider, options: ProviderOptions) -> Self {
		Self { provider, options }
	}

	/// Provider served by this handler.
	pub fn provider(&self) -> Provider {
		self.provider
	}

	/// Builds the platform request and the state that must survive the suspension.
	pub fn build_request(&self, language_code: Option<&str>) -> (OAuthRequest, FlowContext) {
		let raw_nonce = self.requires_nonce().then(generate_raw_nonce);
		let request = OAuthRequest {
			provider: self.provider,
			scopes: self.options.scopes.clone(),
			custom_parameters: self.options.custom_parameters.clone(),
			language_code: language_code.map(ToOwned::to_owned),
			hashed_nonce: raw_nonce.as_ref().map(|nonce| hash_nonce(nonce.expose())),
		};

		(request, FlowContext { raw_nonce })
	}

	/// Parks `call` and opens the browser flow.
	pub fn begin_sign_in(
		&self,
		env: HandlerEnv<'_>,
		token: ContinuationToken,
		call: BoxedCall,
	) -> HandlerStep {
		let (request, context) = self.build_request(env.language_code);

		super::suspend(env, token, self.provider, call, context, PlatformRequest::OAuth(request))
	}

	/// Turns the browser result into a credential carrying the nonce sent with the request.
	pub fn handle_platform_result(
		&self,
		operation: PendingOperation,
		result: PlatformResult,
	) -> HandlerStep {
		let PendingOperation { call, context, .. } = operation;

		super::resolve_platform_result(self.provider, call, result, context.raw_nonce)
	}

	fn requires_nonce(&self) -> bool {
		matches!(self.provider, Provider::Apple)
	}
}

fn generate_raw_nonce() -> TokenSecret {
	TokenSecret::new(
		rand::rng().sample_iter(Alphanumeric).take(RAW_NONCE_LEN).map(char::from).collect::<String>(),
	)
}

fn hash_nonce(raw: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(raw.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::Scopes, call, platform::PlatformTokens};

	#[test]
	fn apple_requests_carry_a_hashed_nonce() {
		let handler = OAuthHandler::new(Provider::Apple, ProviderOptions::default());
		let (request, context) = handler.build_request(Some("fr"));
		let raw = context.raw_nonce.expect("Apple flows should keep a raw nonce.");

		assert_eq!(raw.expose().len(), RAW_NONCE_LEN);
		assert_eq!(request.hashed_nonce.as_deref(), Some(hash_nonce(raw.expose()).as_str()));
		assert_eq!(request.language_code.as_deref(), Some("fr"));
	}

	#[test]
	fn other_providers_send_configured_options_without_nonce() {
		let options = ProviderOptions::default()
			.with_scopes(Scopes::new(["user:email", "read:org"]).expect("Scopes should be valid."))
			.with_custom_parameter("allow_signup", "false");
		let handler = OAuthHandler::new(Provider::Github, options);
		let (request, context) = handler.build_request(None);

		assert_eq!(request.provider, Provider::Github);
		assert_eq!(request.scopes.as_slice(), ["user:email", "read:org"]);
		assert_eq!(request.custom_parameters.get("allow_signup").map(String::as_str), Some("false"));
		assert!(request.hashed_nonce.is_none());
		assert!(context.raw_nonce.is_none());
	}

	#[test]
	fn nonce_hash_is_unpadded_base64url_sha256() {
		// SHA-256("abc"), base64url without padding.
		assert_eq!(hash_nonce("abc"), "ungWv48Bz-pBQUDeXa4iI7ADYaOWF3qctBD_YfIAFa0");
	}

	#[test]
	fn results_keep_the_provider_and_raw_nonce() {
		let handler = OAuthHandler::new(Provider::Apple, ProviderOptions::default());
		let (call, _receiver) = call::channel();
		let token = ContinuationToken::generate();
		let operation = PendingOperation::new(token, Provider::Apple, call.boxed())
			.with_context(FlowContext { raw_nonce: Some(TokenSecret::new("raw-nonce")) });
		let step = handler.handle_platform_result(
			operation,
			PlatformResult::Completed(PlatformTokens::id_token("apple-id-token")),
		);
		let HandlerStep::Credential { credential, .. } = step else {
			panic!("Completed results with a token should produce a credential.");
		};

		assert_eq!(credential.provider(), Provider::Apple);
		assert_eq!(credential.id_token().map(TokenSecret::expose), Some("apple-id-token"));
		assert_eq!(credential.raw_nonce().map(TokenSecret::expose), Some("raw-nonce"));
	}
}
