//! Secret wrapper that redacts sensitive token material.

// self
use crate::_prelude::*;

/// Redacted wrapper keeping tokens, secrets, and nonces out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Wraps the value unless it is empty; platform SDKs report missing tokens as `""`.
	pub fn non_empty(value: impl Into<String>) -> Option<Self> {
		let value = value.into();

		if value.is_empty() { None } else { Some(Self(value)) }
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("eyJhbGciOi");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "eyJhbGciOi");
	}

	#[test]
	fn empty_values_are_treated_as_absent() {
		assert!(TokenSecret::non_empty("").is_none());
		assert!(TokenSecret::non_empty("token").is_some());
	}
}
