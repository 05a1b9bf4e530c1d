//! Read-only configuration loaded once at startup.
//!
//! The JSON shape mirrors a host plugin configuration block:
//!
//! ```json
//! {
//!   "skipNativeAuth": false,
//!   "languageCode": "de",
//!   "providers": {
//!     "apple.com": { "scopes": ["email", "name"], "customParameters": { "locale": "de" } }
//!   },
//!   "google": { "serverClientId": "1234.apps.googleusercontent.com" },
//!   "backend": { "apiKey": "AIza..." }
//! }
//! ```

// self
use crate::{
	_prelude::*,
	auth::{Provider, Scopes},
	error::ConfigError,
};

/// Scopes and custom parameters attached to a provider's sign-in request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderOptions {
	/// Additional OAuth scopes to request.
	pub scopes: Scopes,
	/// Provider-specific query parameters (for example `prompt` or `tenant`).
	pub custom_parameters: BTreeMap<String, String>,
}
impl ProviderOptions {
	/// Replaces the requested scopes.
	pub fn with_scopes(mut self, scopes: Scopes) -> Self {
		self.scopes = scopes;

		self
	}

	/// Adds or replaces a custom parameter.
	pub fn with_custom_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.custom_parameters.insert(key.into(), value.into());

		self
	}
}

/// Native one-tap (Google) client settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GoogleOptions {
	/// Web client id the id token is minted for.
	pub server_client_id: Option<String>,
}

/// Remote identity backend settings used by the REST backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BackendOptions {
	/// Project API key.
	pub api_key: Option<String>,
	/// Override for the Identity Toolkit base URL.
	pub identity_toolkit_url: Option<Url>,
	/// Override for the secure token base URL.
	pub secure_token_url: Option<Url>,
	/// Request URI reported with IdP sign-ins.
	pub request_uri: Option<Url>,
}

/// Sign-in policy and provider settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthConfig {
	/// Return provider credentials as-is instead of exchanging them for a backend session.
	pub skip_native_auth: bool,
	/// Language code applied to the backend session at startup.
	pub language_code: Option<String>,
	/// Per-provider scopes and custom parameters.
	pub providers: BTreeMap<Provider, ProviderOptions>,
	/// One-tap client settings.
	pub google: GoogleOptions,
	/// Remote backend settings.
	pub backend: BackendOptions,
}
impl AuthConfig {
	/// Parses a JSON configuration document, reporting the path of the first invalid field.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(json);

		Ok(serde_path_to_error::deserialize(&mut deserializer)?)
	}

	/// Parses a JSON configuration document from raw bytes.
	pub fn from_json_slice(json: &[u8]) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_slice(json);

		Ok(serde_path_to_error::deserialize(&mut deserializer)?)
	}

	/// Toggles the backend-exchange policy.
	pub fn with_skip_native_auth(mut self, skip: bool) -> Self {
		self.skip_native_auth = skip;

		self
	}

	/// Sets the startup language code.
	pub fn with_language_code(mut self, code: impl Into<String>) -> Self {
		self.language_code = Some(code.into());

		self
	}

	/// Sets the options for a provider.
	pub fn with_provider(mut self, provider: Provider, options: ProviderOptions) -> Self {
		self.providers.insert(provider, options);

		self
	}

	/// Sets the one-tap server client id.
	pub fn with_server_client_id(mut self, client_id: impl Into<String>) -> Self {
		self.google.server_client_id = Some(client_id.into());

		self
	}

	/// Sets the backend API key.
	pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
		self.backend.api_key = Some(api_key.into());

		self
	}

	/// Options configured for `provider`, or empty options when none were configured.
	pub fn provider_options(&self, provider: Provider) -> ProviderOptions {
		self.providers.get(&provider).cloned().unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_exchange_credentials_with_the_backend() {
		let config = AuthConfig::from_json_str("{}").expect("Empty config should parse.");

		assert!(!config.skip_native_auth);
		assert!(config.providers.is_empty());
		assert_eq!(config.provider_options(Provider::Github), ProviderOptions::default());
	}

	#[test]
	fn host_config_shape_parses() {
		let config = AuthConfig::from_json_str(
			r#"{
				"skipNativeAuth": true,
				"languageCode": "de",
				"providers": {
					"microsoft.com": {
						"scopes": ["mail.read", "calendars.read"],
						"customParameters": { "tenant": "contoso.onmicrosoft.com" }
					}
				},
				"google": { "serverClientId": "web-client" },
				"backend": { "apiKey": "key", "identityToolkitUrl": "https://idp.example.com/v1/" }
			}"#,
		)
		.expect("Host config should parse.");
		let microsoft = config.provider_options(Provider::Microsoft);

		assert!(config.skip_native_auth);
		assert_eq!(config.language_code.as_deref(), Some("de"));
		assert_eq!(microsoft.scopes.iter().collect::<Vec<_>>(), vec!["mail.read", "calendars.read"]);
		assert_eq!(
			microsoft.custom_parameters.get("tenant").map(String::as_str),
			Some("contoso.onmicrosoft.com")
		);
		assert_eq!(config.google.server_client_id.as_deref(), Some("web-client"));
		assert_eq!(
			config.backend.identity_toolkit_url.as_ref().map(Url::as_str),
			Some("https://idp.example.com/v1/")
		);
	}

	#[test]
	fn parse_errors_report_the_offending_path() {
		let err = AuthConfig::from_json_str(
			r#"{ "providers": { "apple.com": { "scopes": ["has space"] } } }"#,
		)
		.expect_err("Invalid scopes should be rejected.");

		assert!(
			matches!(&err, ConfigError::Parse { path, .. } if path.contains("scopes")),
			"Unexpected error: {err:?}"
		);

		let err = AuthConfig::from_json_str(r#"{ "providers": { "myspace.com": {} } }"#)
			.expect_err("Unknown providers should be rejected.");

		assert!(matches!(err, ConfigError::Parse { .. }));
	}

	#[test]
	fn builders_compose() {
		let config = AuthConfig::default()
			.with_skip_native_auth(true)
			.with_language_code("fr")
			.with_provider(
				Provider::Yahoo,
				ProviderOptions::default().with_custom_parameter("prompt", "login"),
			);

		assert!(config.skip_native_auth);
		assert_eq!(
			config.provider_options(Provider::Yahoo).custom_parameters.get("prompt"),
			Some(&"login".to_string())
		);
	}
}
