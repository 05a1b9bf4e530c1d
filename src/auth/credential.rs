//! Provider credentials produced by handlers before any backend exchange.

// self
use crate::{
	_prelude::*,
	auth::{Provider, TokenSecret},
};

/// Provider-issued proof of identity that has not been exchanged with the backend yet.
///
/// Credentials are immutable once built. Every field except the provider is optional because
/// flows differ: one-tap flows usually carry only an id token, OAuth 1.0a providers such as
/// Twitter return an access token plus secret, and Apple returns an id token bound to a nonce.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
	provider: Provider,
	id_token: Option<TokenSecret>,
	access_token: Option<TokenSecret>,
	secret: Option<TokenSecret>,
	raw_nonce: Option<TokenSecret>,
}
impl ProviderCredential {
	/// Starts a builder for a credential issued by `provider`.
	pub fn builder(provider: Provider) -> ProviderCredentialBuilder {
		ProviderCredentialBuilder {
			inner: Self {
				provider,
				id_token: None,
				access_token: None,
				secret: None,
				raw_nonce: None,
			},
		}
	}

	/// Provider that issued the credential.
	pub fn provider(&self) -> Provider {
		self.provider
	}

	/// OpenID Connect id token, if the flow produced one.
	pub fn id_token(&self) -> Option<&TokenSecret> {
		self.id_token.as_ref()
	}

	/// OAuth access token, if the flow produced one.
	pub fn access_token(&self) -> Option<&TokenSecret> {
		self.access_token.as_ref()
	}

	/// OAuth 1.0a token secret, if the flow produced one.
	pub fn secret(&self) -> Option<&TokenSecret> {
		self.secret.as_ref()
	}

	/// Raw (unhashed) nonce bound to the id token.
	pub fn raw_nonce(&self) -> Option<&TokenSecret> {
		self.raw_nonce.as_ref()
	}

	/// Returns `true` when the credential carries at least one token the backend can verify.
	pub fn has_token(&self) -> bool {
		self.id_token.is_some() || self.access_token.is_some()
	}
}
impl Debug for ProviderCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderCredential")
			.field("provider", &self.provider)
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
			.field("raw_nonce", &self.raw_nonce.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Builder for [`ProviderCredential`]; empty strings are dropped instead of stored.
#[derive(Clone, Debug)]
pub struct ProviderCredentialBuilder {
	inner: ProviderCredential,
}
impl ProviderCredentialBuilder {
	/// Sets the id token.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.inner.id_token = TokenSecret::non_empty(token);

		self
	}

	/// Sets the access token.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.inner.access_token = TokenSecret::non_empty(token);

		self
	}

	/// Sets the OAuth 1.0a token secret.
	pub fn secret(mut self, secret: impl Into<String>) -> Self {
		self.inner.secret = TokenSecret::non_empty(secret);

		self
	}

	/// Sets the raw nonce.
	pub fn raw_nonce(mut self, nonce: impl Into<String>) -> Self {
		self.inner.raw_nonce = TokenSecret::non_empty(nonce);

		self
	}

	/// Finishes the credential.
	pub fn build(self) -> ProviderCredential {
		self.inner
	}
}
