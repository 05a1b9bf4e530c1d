//! Federated sign-in orchestration for mobile hosts: bridge native one-tap and OAuth browser flows
//! into one identity-backend session with resumable, exactly-once continuations.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod backend;
pub mod call;
pub mod config;
pub mod error;
pub mod flows;
pub mod normalize;
pub mod obs;
pub mod platform;
pub mod provider;
pub mod registry;
pub mod session;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
