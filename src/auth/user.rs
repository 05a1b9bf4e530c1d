//! Backend user snapshots and the uniform sign-in result shape.

// self
use crate::{_prelude::*, normalize::NormalizedCredential};

/// Account timestamps reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
	/// Instant the account was created.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	pub creation_time: Option<OffsetDateTime>,
	/// Instant of the most recent sign-in.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	pub last_sign_in_time: Option<OffsetDateTime>,
}

/// Read-only copy of the backend's current user, taken at the moment a flow completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
	/// Backend user id.
	pub uid: String,
	/// Display name, if known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	/// Email address, if known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Whether the backend has verified the email address.
	#[serde(default)]
	pub email_verified: bool,
	/// Whether the account is anonymous.
	#[serde(default)]
	pub is_anonymous: bool,
	/// Phone number, if known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone_number: Option<String>,
	/// Profile photo URL, if known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub photo_url: Option<String>,
	/// Provider id of the account (for example `firebase`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_id: Option<String>,
	/// Tenant id for multi-tenant projects.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<String>,
	/// Account timestamps.
	#[serde(default)]
	pub metadata: UserMetadata,
}
impl UserSnapshot {
	/// Creates a snapshot with only the uid populated.
	pub fn new(uid: impl Into<String>) -> Self {
		Self {
			uid: uid.into(),
			display_name: None,
			email: None,
			email_verified: false,
			is_anonymous: false,
			phone_number: None,
			photo_url: None,
			provider_id: None,
			tenant_id: None,
			metadata: UserMetadata::default(),
		}
	}
}

/// Uniform outcome handed back to sign-in callers.
///
/// At least one of `user`/`credential` is populated on success: `user` is absent when the
/// backend exchange is skipped, and every built-in flow always attaches a credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResult {
	/// Backend user after the exchange.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<UserSnapshot>,
	/// Normalized provider credential.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub credential: Option<NormalizedCredential>,
}
impl SignInResult {
	/// Returns `true` when neither a user nor a credential is present.
	pub fn is_empty(&self) -> bool {
		self.user.is_none() && self.credential.is_none()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn snapshot_serializes_in_camel_case_without_absent_fields() {
		let mut user = UserSnapshot::new("uid-1");

		user.display_name = Some("Ada".into());
		user.metadata.creation_time = Some(macros::datetime!(2025-01-01 00:00 UTC));

		let json = serde_json::to_value(&user).expect("User snapshot should serialize.");

		assert_eq!(json["uid"], "uid-1");
		assert_eq!(json["displayName"], "Ada");
		assert_eq!(json["emailVerified"], false);
		assert_eq!(json["metadata"]["creationTime"], "2025-01-01T00:00:00Z");
		assert!(json.get("email").is_none());
		assert!(json["metadata"].get("lastSignInTime").is_none());
	}

	#[test]
	fn empty_result_is_detected() {
		let result = SignInResult { user: None, credential: None };

		assert!(result.is_empty());
		assert_eq!(
			serde_json::to_string(&result).expect("Empty result should serialize."),
			"{}"
		);
	}
}
