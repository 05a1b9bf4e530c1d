//! Contracts for the platform's browser and credential UI.
//!
//! Handlers never talk to a browser or a credential manager themselves. They describe the flow
//! as a [`PlatformRequest`] and hand it to a [`PlatformLauncher`] under a continuation token; the
//! host later forwards the matching [`PlatformResult`] to
//! [`Authenticator::handle_platform_result`](crate::flows::Authenticator::handle_platform_result).

// self
use crate::{
	_prelude::*,
	auth::{ContinuationToken, Provider, Scopes},
};

/// Error reported by the platform when it cannot start or reset a flow.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct PlatformError {
	/// Localized platform message.
	pub message: String,
}
impl PlatformError {
	/// Creates a platform error from its localized message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Provider-tagged OAuth request shown in the platform browser UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthRequest {
	/// Provider the request is routed to.
	pub provider: Provider,
	/// Scopes to request.
	pub scopes: Scopes,
	/// Provider-specific query parameters.
	pub custom_parameters: BTreeMap<String, String>,
	/// Language the provider UI should use, when the session has one.
	pub language_code: Option<String>,
	/// Hashed nonce the provider must embed in its id token.
	pub hashed_nonce: Option<String>,
}

/// Native one-tap request shown by the platform credential manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneTapRequest {
	/// Web client id the id token is minted for.
	pub server_client_id: Option<String>,
	/// Scopes to request in addition to the default profile and email.
	pub scopes: Scopes,
}

/// Flow description handed to the [`PlatformLauncher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformRequest {
	/// Redirect-based OAuth flow in a browser tab.
	OAuth(OAuthRequest),
	/// Native one-tap flow.
	OneTap(OneTapRequest),
}
impl PlatformRequest {
	/// Provider the request belongs to.
	pub fn provider(&self) -> Provider {
		match self {
			Self::OAuth(request) => request.provider,
			Self::OneTap(_) => Provider::Google,
		}
	}
}

/// Tokens returned by a completed platform flow; empty strings count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PlatformTokens {
	/// OpenID Connect id token.
	pub id_token: Option<String>,
	/// OAuth access token.
	pub access_token: Option<String>,
	/// OAuth 1.0a token secret.
	pub secret: Option<String>,
}
impl PlatformTokens {
	/// Tokens carrying only an id token.
	pub fn id_token(token: impl Into<String>) -> Self {
		Self { id_token: Some(token.into()), ..Default::default() }
	}

	/// Adds an access token.
	pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Adds a token secret.
	pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(secret.into());

		self
	}
}
impl Debug for PlatformTokens {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PlatformTokens")
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Outcome of an external flow, forwarded by the host's lifecycle hooks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformResult {
	/// The flow finished and returned tokens.
	Completed(PlatformTokens),
	/// The user dismissed the UI.
	Cancelled,
	/// The platform reported a failure.
	Failed {
		/// Localized platform message.
		message: String,
	},
}
impl PlatformResult {
	/// Shorthand for a failed result.
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed { message: message.into() }
	}
}

/// Platform browser/credential UI launcher implemented by the host.
pub trait PlatformLauncher
where
	Self: Send + Sync,
{
	/// Starts the external flow described by `request`.
	///
	/// The host must later report the outcome under the same `token`. Returning an error means
	/// the flow never started and no result will follow.
	fn launch(&self, token: &ContinuationToken, request: PlatformRequest)
	-> Result<(), PlatformError>;

	/// Returns tokens for a previously authorized one-tap account without showing any UI.
	///
	/// The default reports that no silent credential is available.
	fn silent_one_tap(&self, _request: &OneTapRequest) -> Option<PlatformTokens> {
		None
	}

	/// Signs the device out of the one-tap account so the next sign-in shows the picker.
	fn sign_out_one_tap(&self) -> Result<(), PlatformError> {
		Ok(())
	}
}
