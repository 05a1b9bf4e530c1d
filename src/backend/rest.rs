//! Identity Toolkit REST backend built on reqwest.
//!
//! Credential exchanges call `accounts:signInWithIdp` followed by `accounts:lookup` so the
//! returned snapshot carries the full profile, id tokens are refreshed through the secure token
//! endpoint, and the session language travels in the `X-Firebase-Locale` header. Token
//! responses never follow redirects and are decoded with path-qualified errors.

// crates.io
use reqwest::{RequestBuilder, StatusCode, redirect::Policy};
use serde::de::DeserializeOwned;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ProviderCredential, TokenSecret, UserMetadata, UserSnapshot},
	backend::{BackendError, BackendFuture, IdentityBackend},
	config::BackendOptions,
	error::ConfigError,
};

const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/";
const DEFAULT_REQUEST_URI: &str = "http://localhost";
const LOCALE_HEADER: &str = "X-Firebase-Locale";
const REFRESH_WINDOW: Duration = Duration::minutes(5);
const BODY_PREVIEW_LIMIT: usize = 256;

#[derive(Clone, Debug)]
struct Endpoints {
	sign_in_with_idp: Url,
	lookup: Url,
	token: Url,
	request_uri: Url,
}
impl Endpoints {
	fn resolve(options: &BackendOptions) -> Result<Self, ConfigError> {
		let parse = |value: &str| {
			Url::parse(value).map_err(|source| ConfigError::InvalidEndpoint { source })
		};
		let join = |base: &Url, path: &str| {
			base.join(path).map_err(|source| ConfigError::InvalidEndpoint { source })
		};
		let toolkit = match &options.identity_toolkit_url {
			Some(url) => url.clone(),
			None => parse(DEFAULT_IDENTITY_TOOLKIT_URL)?,
		};
		let secure_token = match &options.secure_token_url {
			Some(url) => url.clone(),
			None => parse(DEFAULT_SECURE_TOKEN_URL)?,
		};
		let request_uri = match &options.request_uri {
			Some(url) => url.clone(),
			None => parse(DEFAULT_REQUEST_URI)?,
		};

		Ok(Self {
			sign_in_with_idp: join(&toolkit, "./accounts:signInWithIdp")?,
			lookup: join(&toolkit, "./accounts:lookup")?,
			token: join(&secure_token, "./token")?,
			request_uri,
		})
	}
}

struct RestSession {
	user: UserSnapshot,
	id_token: TokenSecret,
	refresh_token: TokenSecret,
	expires_at: OffsetDateTime,
}
impl RestSession {
	fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at - now > REFRESH_WINDOW
	}
}

/// [`IdentityBackend`] that talks to the Identity Toolkit REST API.
#[derive(Clone)]
pub struct RestBackend {
	client: ReqwestClient,
	api_key: String,
	endpoints: Endpoints,
	session: Arc<Mutex<Option<RestSession>>>,
	language_code: Arc<RwLock<Option<String>>>,
	app_language: Option<String>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl RestBackend {
	/// Creates a backend with its own reqwest client that never follows redirects.
	pub fn new(options: &BackendOptions) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Self::with_client(options, client)
	}

	/// Creates a backend that reuses the caller's reqwest client.
	pub fn with_client(options: &BackendOptions, client: ReqwestClient) -> Result<Self, ConfigError> {
		let api_key = options.api_key.clone().ok_or(ConfigError::MissingApiKey)?;

		Ok(Self {
			client,
			api_key,
			endpoints: Endpoints::resolve(options)?,
			session: Default::default(),
			language_code: Default::default(),
			app_language: None,
			refresh_guard: Default::default(),
		})
	}

	/// Sets the language [`IdentityBackend::use_app_language`] switches to.
	pub fn with_app_language(mut self, code: impl Into<String>) -> Self {
		self.app_language = Some(code.into());

		self
	}

	async fn exchange(&self, credential: &ProviderCredential) -> Result<UserSnapshot, BackendError> {
		let body = SignInWithIdpRequest {
			post_body: idp_post_body(credential),
			request_uri: self.endpoints.request_uri.as_str(),
			return_idp_credential: true,
			return_secure_token: true,
		};
		let idp: SignInWithIdpResponse =
			self.send(self.post(&self.endpoints.sign_in_with_idp).json(&body)).await?;
		let expires_at = expiry_after(OffsetDateTime::now_utc(), &idp.expires_in)?;
		let lookup: LookupResponse = self
			.send(
				self.post(&self.endpoints.lookup)
					.json(&LookupRequest { id_token: idp.id_token.as_str() }),
			)
			.await?;
		let account = lookup.users.into_iter().find(|account| account.local_id == idp.local_id);
		let user = snapshot(&idp, account);

		*self.session.lock() = Some(RestSession {
			user: user.clone(),
			id_token: TokenSecret::new(idp.id_token),
			refresh_token: TokenSecret::new(idp.refresh_token),
			expires_at,
		});

		Ok(user)
	}

	async fn refresh(&self, force_refresh: bool) -> Result<String, BackendError> {
		let _singleflight = self.refresh_guard.lock().await;
		let refresh_token = {
			let session = self.session.lock();
			let session = session.as_ref().ok_or(BackendError::NoCurrentUser)?;

			if !force_refresh && session.is_fresh_at(OffsetDateTime::now_utc()) {
				return Ok(session.id_token.expose().to_owned());
			}

			session.refresh_token.expose().to_owned()
		};
		let issued_at = OffsetDateTime::now_utc();
		let response: SecureTokenResponse = self
			.send(self.post(&self.endpoints.token).form(&[
				("grant_type", "refresh_token"),
				("refresh_token", refresh_token.as_str()),
			]))
			.await?;
		let expires_at = expiry_after(issued_at, &response.expires_in)?;
		let mut session = self.session.lock();
		// A sign-out while the refresh was in flight wins.
		let current = session.as_mut().ok_or(BackendError::NoCurrentUser)?;

		// Another account signed in meanwhile; its tokens must not be overwritten.
		if current.refresh_token.expose() != refresh_token {
			tracing::debug!("Session changed during token refresh; discarding the refreshed tokens.");

			return Ok(current.id_token.expose().to_owned());
		}

		current.id_token = TokenSecret::new(response.id_token.clone());
		current.refresh_token = TokenSecret::new(response.refresh_token);
		current.expires_at = expires_at;

		Ok(response.id_token)
	}

	fn post(&self, url: &Url) -> RequestBuilder {
		let request = self.client.post(url.clone()).query(&[("key", self.api_key.as_str())]);

		match self.language_code.read().as_deref() {
			Some(code) => request.header(LOCALE_HEADER, code),
			None => request,
		}
	}

	async fn send<T>(&self, request: RequestBuilder) -> Result<T, BackendError>
	where
		T: DeserializeOwned,
	{
		let response = request.send().await?;
		let status = response.status();
		let bytes = response.bytes().await?;

		if !status.is_success() {
			return Err(map_error_body(status, &bytes));
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| BackendError::Decode { source, status: Some(status.as_u16()) })
	}
}
impl Debug for RestBackend {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RestBackend")
			.field("endpoints", &self.endpoints)
			.field("api_key_set", &!self.api_key.is_empty())
			.field("signed_in", &self.session.lock().is_some())
			.finish()
	}
}
impl IdentityBackend for RestBackend {
	fn current_user(&self) -> Option<UserSnapshot> {
		self.session.lock().as_ref().map(|session| session.user.clone())
	}

	fn sign_in_with_credential<'a>(
		&'a self,
		credential: &'a ProviderCredential,
	) -> BackendFuture<'a, UserSnapshot> {
		Box::pin(self.exchange(credential))
	}

	fn sign_out(&self) {
		self.session.lock().take();
	}

	fn id_token(&self, force_refresh: bool) -> BackendFuture<'_, String> {
		Box::pin(self.refresh(force_refresh))
	}

	fn language_code(&self) -> Option<String> {
		self.language_code.read().clone()
	}

	fn set_language_code(&self, code: Option<String>) {
		*self.language_code.write() = code;
	}

	fn use_app_language(&self) {
		*self.language_code.write() = self.app_language.clone();
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
	post_body: String,
	request_uri: &'a str,
	return_idp_credential: bool,
	return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
	local_id: String,
	id_token: String,
	refresh_token: String,
	expires_in: String,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	email_verified: bool,
	#[serde(default)]
	display_name: Option<String>,
	#[serde(default)]
	photo_url: Option<String>,
	#[serde(default)]
	tenant_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
	id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
	#[serde(default)]
	users: Vec<LookupAccount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupAccount {
	local_id: String,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	email_verified: bool,
	#[serde(default)]
	display_name: Option<String>,
	#[serde(default)]
	photo_url: Option<String>,
	#[serde(default)]
	phone_number: Option<String>,
	#[serde(default)]
	created_at: Option<String>,
	#[serde(default)]
	last_login_at: Option<String>,
}

#[derive(Deserialize)]
struct SecureTokenResponse {
	id_token: String,
	refresh_token: String,
	expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
	error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
	message: String,
}

fn idp_post_body(credential: &ProviderCredential) -> String {
	let mut form = form_urlencoded::Serializer::new(String::new());

	if let Some(token) = credential.id_token() {
		form.append_pair("id_token", token.expose());
	}
	if let Some(token) = credential.access_token() {
		form.append_pair("access_token", token.expose());
	}
	if let Some(secret) = credential.secret() {
		form.append_pair("oauth_token_secret", secret.expose());
	}
	if let Some(nonce) = credential.raw_nonce() {
		form.append_pair("nonce", nonce.expose());
	}

	form.append_pair("providerId", credential.provider().id());

	form.finish()
}

fn snapshot(idp: &SignInWithIdpResponse, account: Option<LookupAccount>) -> UserSnapshot {
	let mut user = UserSnapshot::new(idp.local_id.clone());

	user.provider_id = Some("firebase".into());
	user.tenant_id = idp.tenant_id.clone();
	user.email = idp.email.clone();
	user.email_verified = idp.email_verified;
	user.display_name = idp.display_name.clone();
	user.photo_url = idp.photo_url.clone();

	if let Some(account) = account {
		user.email = account.email.or(user.email);
		user.email_verified |= account.email_verified;
		user.display_name = account.display_name.or(user.display_name);
		user.photo_url = account.photo_url.or(user.photo_url);
		user.phone_number = account.phone_number;
		user.metadata = UserMetadata {
			creation_time: account.created_at.as_deref().and_then(parse_millis),
			last_sign_in_time: account.last_login_at.as_deref().and_then(parse_millis),
		};
	}

	user
}

fn parse_expires_in(raw: &str) -> Result<Duration, BackendError> {
	raw.parse::<i64>()
		.ok()
		.filter(|secs| *secs > 0)
		.map(Duration::seconds)
		.ok_or_else(|| BackendError::Unavailable { message: format!("Invalid expiresIn `{raw}`.") })
}

fn expiry_after(issued_at: OffsetDateTime, raw: &str) -> Result<OffsetDateTime, BackendError> {
	issued_at.checked_add(parse_expires_in(raw)?).ok_or_else(|| BackendError::Unavailable {
		message: format!("expiresIn `{raw}` is out of range."),
	})
}

fn parse_millis(raw: &str) -> Option<OffsetDateTime> {
	let nanos = raw.parse::<i128>().ok()?.checked_mul(1_000_000)?;

	OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

fn map_error_body(status: StatusCode, body: &[u8]) -> BackendError {
	if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
		let message = envelope.error.message;

		return if status.is_server_error() {
			BackendError::Unavailable { message }
		} else {
			BackendError::Rejected { message }
		};
	}

	let preview: String = String::from_utf8_lossy(body).chars().take(BODY_PREVIEW_LIMIT).collect();

	BackendError::Unavailable { message: format!("Identity backend returned {status}: {preview}") }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::Provider;

	#[test]
	fn endpoints_join_under_the_configured_base() {
		let options = BackendOptions {
			api_key: Some("key".into()),
			identity_toolkit_url: Some(
				Url::parse("http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/")
					.expect("Emulator URL should parse."),
			),
			..Default::default()
		};
		let endpoints = Endpoints::resolve(&options).expect("Endpoints should resolve.");

		assert_eq!(
			endpoints.sign_in_with_idp.as_str(),
			"http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/accounts:signInWithIdp"
		);
		assert_eq!(endpoints.token.as_str(), "https://securetoken.googleapis.com/v1/token");
		assert_eq!(endpoints.request_uri.as_str(), "http://localhost/");
	}

	#[test]
	fn missing_api_key_is_a_config_error() {
		let err = RestBackend::new(&BackendOptions::default())
			.expect_err("Backends without an API key should be rejected.");

		assert!(matches!(err, ConfigError::MissingApiKey));
	}

	#[test]
	fn post_body_carries_only_present_fields() {
		let credential = ProviderCredential::builder(Provider::Twitter)
			.access_token("access token")
			.secret("s3cret")
			.build();
		let pairs: HashMap<_, _> =
			form_urlencoded::parse(idp_post_body(&credential).as_bytes()).into_owned().collect();

		assert_eq!(pairs.get("access_token").map(String::as_str), Some("access token"));
		assert_eq!(pairs.get("oauth_token_secret").map(String::as_str), Some("s3cret"));
		assert_eq!(pairs.get("providerId").map(String::as_str), Some("twitter.com"));
		assert!(!pairs.contains_key("id_token"));
		assert!(!pairs.contains_key("nonce"));
	}

	#[test]
	fn error_bodies_map_to_rejections_or_outages() {
		let body = br#"{"error":{"code":400,"message":"INVALID_IDP_RESPONSE"}}"#;

		assert!(matches!(
			map_error_body(StatusCode::BAD_REQUEST, body),
			BackendError::Rejected { message } if message == "INVALID_IDP_RESPONSE"
		));
		assert!(matches!(
			map_error_body(StatusCode::SERVICE_UNAVAILABLE, body),
			BackendError::Unavailable { .. }
		));
		assert!(matches!(
			map_error_body(StatusCode::BAD_GATEWAY, b"<html>"),
			BackendError::Unavailable { message } if message.contains("<html>")
		));
	}

	#[test]
	fn expiry_and_timestamps_parse() {
		assert_eq!(parse_expires_in("3600").ok(), Some(Duration::hours(1)));
		assert!(parse_expires_in("0").is_err());
		assert!(parse_expires_in("soon").is_err());
		assert_eq!(
			parse_millis("1700000000000").map(OffsetDateTime::unix_timestamp),
			Some(1_700_000_000)
		);
		assert!(parse_millis("100000000000000000000000000000000000").is_none());
		assert!(parse_millis("-99999999999999999999").is_none());
		assert!(expiry_after(OffsetDateTime::now_utc(), &i64::MAX.to_string()).is_err());
	}
}
