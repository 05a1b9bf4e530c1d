//! Drives an Apple redirect flow the way a host would: the launcher hands the request to a
//! simulated browser task, and the task reports the redirect back by continuation token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use tokio::sync::mpsc::{self, UnboundedSender};
// self
use federated_auth::{
	auth::ContinuationToken,
	backend::MemoryBackend,
	call,
	config::AuthConfig,
	flows::Authenticator,
	platform::{PlatformError, PlatformLauncher, PlatformRequest, PlatformResult, PlatformTokens},
};

const CONFIG: &str = r#"{
	"languageCode": "de",
	"providers": {
		"apple.com": { "scopes": ["email", "name"] }
	}
}"#;

struct BrowserLauncher(UnboundedSender<(ContinuationToken, PlatformRequest)>);
impl PlatformLauncher for BrowserLauncher {
	fn launch(&self, token: &ContinuationToken, request: PlatformRequest) -> Result<(), PlatformError> {
		self.0.send((token.clone(), request)).map_err(|_| PlatformError::new("Browser is gone."))
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let (tx, mut rx) = mpsc::unbounded_channel();
	let authenticator = Arc::new(Authenticator::new(
		AuthConfig::from_json_str(CONFIG)?,
		Arc::new(MemoryBackend::default()),
		Arc::new(BrowserLauncher(tx)),
	));
	let browser = tokio::spawn({
		let authenticator = authenticator.clone();

		async move {
			while let Some((token, request)) = rx.recv().await {
				if let PlatformRequest::OAuth(request) = request {
					println!(
						"Opening {} consent for scopes `{}` (language {:?}, nonce hash {:?}).",
						request.provider,
						request.scopes,
						request.language_code,
						request.hashed_nonce
					);
				}

				let redirect = PlatformResult::Completed(PlatformTokens::id_token("apple-id-token"));

				if let Err(err) = authenticator.handle_platform_result(&token, redirect).await {
					eprintln!("Redirect for `{token}` was not delivered: {err}.");
				}
			}
		}
	});
	let (call, receiver) = call::channel();
	let progress = authenticator.sign_in_with_apple(call.boxed()).await;

	println!("Sign-in progress: {progress:?}.");

	let result = receiver.outcome().await?;

	if let Some(user) = &result.user {
		println!("Signed in as {}.", user.uid);
	}

	println!("Sign-in result: {}.", serde_json::to_string_pretty(&result)?);

	authenticator.sign_out();
	browser.abort();

	Ok(())
}
