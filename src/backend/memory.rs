//! Thread-safe in-memory [`IdentityBackend`] for local development, demos, and tests.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ProviderCredential, TokenSecret, UserSnapshot},
	backend::{BackendError, BackendFuture, IdentityBackend},
};

const UID_LEN: usize = 28;
const DEFAULT_TOKEN_TTL: Duration = Duration::hours(1);

#[derive(Debug, Default)]
struct MemoryState {
	accounts: HashMap<String, UserSnapshot>,
	current: Option<String>,
	id_token: Option<IssuedToken>,
	language_code: Option<String>,
	sign_in_rejection: Option<String>,
	sign_in_outage: Option<String>,
	refresh_rejection: Option<String>,
}

#[derive(Clone, Debug)]
struct IssuedToken {
	secret: TokenSecret,
	expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct Counters {
	sign_ins: AtomicU64,
	refreshes: AtomicU64,
	serial: AtomicU64,
}

/// In-process backend that accepts any credential carrying a token.
///
/// The account id is derived from the provider and the presented token, so presenting the same
/// token twice signs in the same account. Failure switches let tests script backend rejections,
/// outages, and refresh failures.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
	state: Arc<RwLock<MemoryState>>,
	counters: Arc<Counters>,
	refresh_guard: Arc<AsyncMutex<()>>,
	app_language: Option<String>,
	token_ttl: Duration,
}
impl MemoryBackend {
	/// Creates an empty backend whose application language is `app_language`.
	pub fn new(app_language: Option<String>) -> Self {
		Self {
			state: Default::default(),
			counters: Default::default(),
			refresh_guard: Default::default(),
			app_language,
			token_ttl: DEFAULT_TOKEN_TTL,
		}
	}

	/// Overrides how long issued id tokens stay fresh.
	pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
		self.token_ttl = ttl;

		self
	}

	/// Makes subsequent credential exchanges fail with an explicit backend rejection.
	pub fn reject_sign_ins(&self, message: impl Into<String>) {
		self.state.write().sign_in_rejection = Some(message.into());
	}

	/// Makes subsequent credential exchanges fail as if the backend were unreachable.
	pub fn break_sign_ins(&self, message: impl Into<String>) {
		self.state.write().sign_in_outage = Some(message.into());
	}

	/// Makes subsequent token refreshes fail with `message`.
	pub fn reject_refreshes(&self, message: impl Into<String>) {
		self.state.write().refresh_rejection = Some(message.into());
	}

	/// Clears every failure switch.
	pub fn heal(&self) {
		let mut state = self.state.write();

		state.sign_in_rejection = None;
		state.sign_in_outage = None;
		state.refresh_rejection = None;
	}

	/// Number of credential exchanges attempted.
	pub fn sign_in_calls(&self) -> u64 {
		self.counters.sign_ins.load(Ordering::Relaxed)
	}

	/// Number of id token refreshes performed.
	pub fn refresh_calls(&self) -> u64 {
		self.counters.refreshes.load(Ordering::Relaxed)
	}

	fn sign_in_now(&self, credential: &ProviderCredential) -> Result<UserSnapshot, BackendError> {
		self.counters.sign_ins.fetch_add(1, Ordering::Relaxed);

		let mut state = self.state.write();

		if let Some(message) = state.sign_in_outage.clone() {
			return Err(BackendError::Unavailable { message });
		}
		if let Some(message) = state.sign_in_rejection.clone() {
			return Err(BackendError::Rejected { message });
		}

		let uid = derive_uid(credential)
			.ok_or_else(|| BackendError::Rejected { message: "INVALID_IDP_RESPONSE".into() })?;
		let now = OffsetDateTime::now_utc();
		let account = state.accounts.entry(uid.clone()).or_insert_with(|| {
			let mut user = UserSnapshot::new(uid.clone());

			user.provider_id = Some("firebase".into());
			user.metadata.creation_time = Some(now);

			user
		});

		account.metadata.last_sign_in_time = Some(now);

		let snapshot = account.clone();

		state.current = Some(uid);
		state.id_token = Some(self.issue(&snapshot.uid, now));

		Ok(snapshot)
	}

	fn issue(&self, uid: &str, now: OffsetDateTime) -> IssuedToken {
		let serial = self.counters.serial.fetch_add(1, Ordering::Relaxed);

		IssuedToken {
			secret: TokenSecret::new(format!("memory.{uid}.{serial}")),
			expires_at: now + self.token_ttl,
		}
	}
}
impl Default for MemoryBackend {
	fn default() -> Self {
		Self::new(None)
	}
}
impl IdentityBackend for MemoryBackend {
	fn current_user(&self) -> Option<UserSnapshot> {
		let state = self.state.read();

		state.current.as_ref().and_then(|uid| state.accounts.get(uid)).cloned()
	}

	fn sign_in_with_credential<'a>(
		&'a self,
		credential: &'a ProviderCredential,
	) -> BackendFuture<'a, UserSnapshot> {
		Box::pin(async move { self.sign_in_now(credential) })
	}

	fn sign_out(&self) {
		let mut state = self.state.write();

		state.current = None;
		state.id_token = None;
	}

	fn id_token(&self, force_refresh: bool) -> BackendFuture<'_, String> {
		Box::pin(async move {
			let _singleflight = self.refresh_guard.lock().await;
			let now = OffsetDateTime::now_utc();
			let mut state = self.state.write();
			let uid = state.current.clone().ok_or(BackendError::NoCurrentUser)?;
			let fresh = state
				.id_token
				.as_ref()
				.filter(|token| !force_refresh && token.expires_at > now)
				.map(|token| token.secret.expose().to_owned());

			if let Some(token) = fresh {
				return Ok(token);
			}
			if let Some(message) = state.refresh_rejection.clone() {
				return Err(BackendError::Rejected { message });
			}

			self.counters.refreshes.fetch_add(1, Ordering::Relaxed);

			let issued = self.issue(&uid, now);
			let token = issued.secret.expose().to_owned();

			state.id_token = Some(issued);

			Ok(token)
		})
	}

	fn language_code(&self) -> Option<String> {
		self.state.read().language_code.clone()
	}

	fn set_language_code(&self, code: Option<String>) {
		self.state.write().language_code = code;
	}

	fn use_app_language(&self) {
		self.state.write().language_code = self.app_language.clone();
	}
}

fn derive_uid(credential: &ProviderCredential) -> Option<String> {
	let token = credential.id_token().or(credential.access_token())?;
	let mut hasher = Sha256::new();

	hasher.update(credential.provider().id().as_bytes());
	hasher.update(b":");
	hasher.update(token.expose().as_bytes());

	let mut uid = URL_SAFE_NO_PAD.encode(hasher.finalize());

	uid.truncate(UID_LEN);

	Some(uid)
}
