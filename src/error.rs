//! Crate-level error types shared across handlers, the registry, and the session orchestrator.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Constant message surfaced for every failed backend credential exchange.
pub const SIGN_IN_FAILED_MESSAGE: &str = "signIn failed.";

/// Canonical error exposed to sign-in callers and host lifecycle hooks.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The user abandoned the external flow.
	#[error("Sign-in was cancelled by the user.")]
	SignInCancelled,
	/// The backend credential exchange failed; the detail is logged, never surfaced.
	#[error("signIn failed.")]
	SignInFailed {
		/// How the exchange failed, kept for observability only.
		cause: ExchangeFailure,
	},
	/// The platform flow failed before any credential was produced.
	#[error("{message}")]
	ProviderFailed {
		/// Platform- or provider-supplied localized message.
		message: String,
	},
	/// No user is signed in to the backend session.
	#[error("No user is signed in.")]
	NoCurrentUser,
	/// The backend could not produce an id token.
	#[error("{message}")]
	TokenRefreshFailed {
		/// Backend-supplied localized message.
		message: String,
	},
	/// A second operation was registered for a continuation token that is still pending.
	#[error("An operation is already pending for continuation token `{token}`.")]
	DuplicatePendingOperation {
		/// Continuation token that was already in use.
		token: String,
	},
	/// A platform result or teardown arrived for a token nobody is waiting on.
	#[error("No operation is pending for continuation token `{token}`.")]
	UnknownContinuation {
		/// Continuation token that did not match a pending operation.
		token: String,
	},
}
impl Error {
	/// Stable machine-readable code for host bridges.
	pub const fn code(&self) -> &'static str {
		match self {
			Self::Config(_) => "config",
			Self::SignInCancelled => "sign-in-cancelled",
			Self::SignInFailed { .. } => "sign-in-failed",
			Self::ProviderFailed { .. } => "provider-failed",
			Self::NoCurrentUser => "no-current-user",
			Self::TokenRefreshFailed { .. } => "token-refresh-failed",
			Self::DuplicatePendingOperation { .. } => "duplicate-pending-operation",
			Self::UnknownContinuation { .. } => "unknown-continuation",
		}
	}

	/// Returns `true` when the error reflects expected user behavior rather than a failure.
	pub const fn is_cancellation(&self) -> bool {
		matches!(self, Self::SignInCancelled)
	}

	pub(crate) fn provider_failed(message: impl Into<String>) -> Self {
		Self::ProviderFailed { message: message.into() }
	}
}

/// Distinguishes how a backend credential exchange failed.
///
/// Both variants surface the same [`SIGN_IN_FAILED_MESSAGE`] to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeFailure {
	/// The backend answered and refused the credential.
	Rejected,
	/// The exchange never produced an answer (transport, decoding, or internal failure).
	Exception,
}
impl ExchangeFailure {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Rejected => "rejected",
			Self::Exception => "exception",
		}
	}
}
impl Display for ExchangeFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// Path of the offending field inside the document.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// A continuation token failed validation.
	#[error(transparent)]
	InvalidToken(#[from] crate::auth::IdentifierError),
	/// Provider scopes failed validation.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// The provider identifier is not one of the supported federated providers.
	#[error("Provider `{provider_id}` is not supported.")]
	UnsupportedProvider {
		/// Identifier that failed to match.
		provider_id: String,
	},
	/// A backend endpoint URL cannot be parsed or joined.
	#[error("Backend endpoint is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The remote backend requires an API key but none was configured.
	#[error("Backend API key is missing.")]
	MissingApiKey,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_failures_share_the_fixed_message() {
		let rejected = Error::SignInFailed { cause: ExchangeFailure::Rejected };
		let exception = Error::SignInFailed { cause: ExchangeFailure::Exception };

		assert_eq!(rejected.to_string(), SIGN_IN_FAILED_MESSAGE);
		assert_eq!(exception.to_string(), SIGN_IN_FAILED_MESSAGE);
		assert_eq!(rejected.code(), exception.code());
	}

	#[test]
	fn provider_and_refresh_failures_surface_their_message() {
		let provider = Error::provider_failed("The network is unreachable.");
		let refresh = Error::TokenRefreshFailed { message: "TOKEN_EXPIRED".into() };

		assert_eq!(provider.to_string(), "The network is unreachable.");
		assert_eq!(refresh.to_string(), "TOKEN_EXPIRED");
		assert!(!provider.is_cancellation());
		assert!(Error::SignInCancelled.is_cancellation());
	}

	#[test]
	fn config_errors_keep_their_source() {
		let err: Error = ConfigError::UnsupportedProvider { provider_id: "myspace.com".into() }.into();

		assert_eq!(err.code(), "config");
		assert!(err.to_string().contains("myspace.com"));
	}
}
