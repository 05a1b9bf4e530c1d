//! Identity-backend session contract and built-in backends.
//!
//! The backend session is owned by the identity provider's SDK (or REST API). The sign-in core
//! only reads the current user and triggers exchanges, sign-outs, token refreshes, and language
//! changes through [`IdentityBackend`], which is injected at construction instead of being looked
//! up globally.

pub mod memory;
#[cfg(feature = "reqwest")] pub mod rest;

pub use memory::MemoryBackend;
#[cfg(feature = "reqwest")] pub use rest::RestBackend;

// self
use crate::{
	_prelude::*,
	auth::{ProviderCredential, UserSnapshot},
	error::ExchangeFailure,
};

/// Boxed future returned by [`IdentityBackend`] operations that hit the network.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + 'a + Send>>;

/// Session operations the sign-in core needs from the identity backend.
pub trait IdentityBackend
where
	Self: Send + Sync,
{
	/// Snapshot of the signed-in user, if any. Never touches the network.
	fn current_user(&self) -> Option<UserSnapshot>;

	/// Exchanges a provider credential for a backend session and returns the new current user.
	fn sign_in_with_credential<'a>(
		&'a self,
		credential: &'a ProviderCredential,
	) -> BackendFuture<'a, UserSnapshot>;

	/// Ends the backend session locally.
	fn sign_out(&self);

	/// Returns the current user's id token, refreshing it when forced or stale.
	fn id_token(&self, force_refresh: bool) -> BackendFuture<'_, String>;

	/// Language code sent with backend requests and provider UIs.
	fn language_code(&self) -> Option<String>;

	/// Overrides the language code.
	fn set_language_code(&self, code: Option<String>);

	/// Resets the language code to the application's language.
	fn use_app_language(&self);
}

/// Failure reported by an [`IdentityBackend`].
#[derive(Debug, ThisError)]
pub enum BackendError {
	/// The backend answered and refused the request.
	#[error("{message}")]
	Rejected {
		/// Backend-supplied (localized) message or error code.
		message: String,
	},
	/// The operation requires a signed-in user.
	#[error("No user is signed in.")]
	NoCurrentUser,
	/// The backend could not be reached or failed internally.
	#[error("{message}")]
	Unavailable {
		/// Human-readable description.
		message: String,
	},
	/// Transport failure (DNS, TCP, TLS).
	#[error("Network error occurred while calling the identity backend.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},
	/// The backend answered with a body that could not be decoded.
	#[error("Identity backend returned malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl BackendError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// How a credential exchange failing with this error is classified.
	pub fn exchange_failure(&self) -> ExchangeFailure {
		match self {
			Self::Rejected { .. } => ExchangeFailure::Rejected,
			_ => ExchangeFailure::Exception,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for BackendError {
	fn from(e: ReqwestError) -> Self {
		Self::transport(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_explicit_rejections_classify_as_rejected() {
		assert_eq!(
			BackendError::Rejected { message: "INVALID_IDP_RESPONSE".into() }.exchange_failure(),
			ExchangeFailure::Rejected
		);
		assert_eq!(
			BackendError::Unavailable { message: "down".into() }.exchange_failure(),
			ExchangeFailure::Exception
		);
		assert_eq!(
			BackendError::transport(std::io::Error::other("reset")).exchange_failure(),
			ExchangeFailure::Exception
		);
	}
}
