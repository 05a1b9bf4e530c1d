//! Credential normalization into the caller-facing result shape.
//!
//! [`normalize`] is pure: it never contacts the backend and never substitutes defaults for
//! fields the provider did not return.

// self
use crate::{
	_prelude::*,
	auth::{ProviderCredential, TokenSecret},
};

/// Caller-facing view of a provider credential.
///
/// Tokens are exposed in plain text here because the record is handed back to the caller that
/// owns them; it must not be logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCredential {
	/// Backend provider id (for example `apple.com`).
	pub provider_id: String,
	/// OpenID Connect id token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
	/// OAuth access token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<String>,
	/// OAuth 1.0a token secret.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret: Option<String>,
	/// Raw nonce bound to the id token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
}
impl Debug for NormalizedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NormalizedCredential")
			.field("provider_id", &self.provider_id)
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
			.field("nonce", &self.nonce.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Converts a provider credential into its caller-facing record.
pub fn normalize(credential: &ProviderCredential) -> NormalizedCredential {
	let reveal = |secret: Option<&TokenSecret>| secret.map(|s| s.expose().to_owned());

	NormalizedCredential {
		provider_id: credential.provider().id().to_owned(),
		id_token: reveal(credential.id_token()),
		access_token: reveal(credential.access_token()),
		secret: reveal(credential.secret()),
		nonce: reveal(credential.raw_nonce()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::Provider;

	#[test]
	fn id_token_only_flows_omit_everything_else() {
		let credential = ProviderCredential::builder(Provider::Google).id_token("id-token").build();
		let normalized = normalize(&credential);

		assert_eq!(normalized.provider_id, "google.com");
		assert_eq!(normalized.id_token.as_deref(), Some("id-token"));
		assert!(normalized.access_token.is_none());
		assert!(normalized.secret.is_none());
		assert!(normalized.nonce.is_none());

		let json = serde_json::to_value(&normalized).expect("Credential should serialize.");

		assert_eq!(json, serde_json::json!({ "providerId": "google.com", "idToken": "id-token" }));
	}

	#[test]
	fn oauth1_and_nonce_fields_are_carried_through() {
		let twitter = ProviderCredential::builder(Provider::Twitter)
			.access_token("access")
			.secret("secret")
			.build();
		let apple = ProviderCredential::builder(Provider::Apple)
			.id_token("id-token")
			.raw_nonce("raw-nonce")
			.build();

		assert_eq!(normalize(&twitter).secret.as_deref(), Some("secret"));
		assert_eq!(normalize(&apple).nonce.as_deref(), Some("raw-nonce"));
	}

	#[test]
	fn normalization_is_deterministic() {
		let credential =
			ProviderCredential::builder(Provider::Github).access_token("gho_token").build();

		assert_eq!(normalize(&credential), normalize(&credential));
	}
}
