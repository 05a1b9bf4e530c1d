//! Auth-domain identifiers, scopes, credentials, and user snapshots.

pub mod credential;
pub mod id;
pub mod scope;
pub mod secret;
pub mod user;

pub use credential::*;
pub use id::*;
pub use scope::*;
pub use secret::*;
pub use user::*;
