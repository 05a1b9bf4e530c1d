//! Signs in with Google one-tap twice: the first attempt shows the picker, the second reuses the
//! cached account without any UI. Set `skip` as the first argument to return the raw credential
//! instead of exchanging it.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
use parking_lot::Mutex;
// self
use federated_auth::{
	auth::ContinuationToken,
	backend::MemoryBackend,
	call,
	config::AuthConfig,
	flows::Authenticator,
	platform::{PlatformError, PlatformLauncher, PlatformRequest, PlatformResult, PlatformTokens},
};

#[derive(Default)]
struct PickerLauncher {
	shown: Mutex<Option<ContinuationToken>>,
}
impl PlatformLauncher for PickerLauncher {
	fn launch(&self, token: &ContinuationToken, request: PlatformRequest) -> Result<(), PlatformError> {
		println!("Showing the account picker: {request:?}.");

		*self.shown.lock() = Some(token.clone());

		Ok(())
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let skip = env::args().nth(1).is_some_and(|arg| arg == "skip");
	let config = AuthConfig::default()
		.with_skip_native_auth(skip)
		.with_server_client_id("1234.apps.googleusercontent.com");
	let launcher = Arc::new(PickerLauncher::default());
	let authenticator =
		Authenticator::new(config, Arc::new(MemoryBackend::default()), launcher.clone());
	let (call, receiver) = call::channel();

	authenticator.sign_in_with_google(call.boxed()).await;

	let token =
		launcher.shown.lock().take().ok_or_else(|| eyre!("The picker should have been shown."))?;

	authenticator
		.handle_platform_result(
			&token,
			PlatformResult::Completed(PlatformTokens::id_token("google-id-token")),
		)
		.await?;

	let first = receiver.outcome().await?;

	println!("First sign-in: {}.", serde_json::to_string_pretty(&first)?);

	let (call, receiver) = call::channel();
	let progress = authenticator.sign_in_with_google(call.boxed()).await;
	let second = receiver.outcome().await?;

	println!("Second sign-in ({progress:?}) reused uid {:?}.", second.user.map(|user| user.uid));

	if !skip {
		println!("Id token: {}.", authenticator.get_id_token(false).await?);
	}

	authenticator.sign_out();

	Ok(())
}
