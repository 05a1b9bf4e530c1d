//! Provider scope lists requested during federated sign-in.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Ordered, deduplicated list of OAuth scopes handed to a provider.
///
/// Unlike token-endpoint scope sets, the order is preserved because several providers echo the
/// requested order back on their consent screens. Duplicates keep their first position.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Scopes(Arc<[String]>);
impl Scopes {
	/// Creates a validated scope list from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut ordered = Vec::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}
			if !ordered.contains(&owned) {
				ordered.push(owned);
			}
		}

		Ok(Self(Arc::from(ordered)))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over the scopes in request order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.0
	}
}
impl Debug for Scopes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Scopes").field(&self.0).finish()
	}
}
impl Display for Scopes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0.join(" "))
	}
}
impl FromStr for Scopes {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for Scopes {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for scope in self.0.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for Scopes {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		Scopes::new(values).map_err(DeError::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_keep_first_occurrence_order() {
		let scopes = Scopes::new(["user:email", "read:user", "user:email"])
			.expect("Scope fixture should be valid.");

		assert_eq!(scopes.as_slice(), ["user:email".to_string(), "read:user".to_string()]);
		assert_eq!(scopes.to_string(), "user:email read:user");
		assert!(scopes.contains("read:user"));
	}

	#[test]
	fn scopes_reject_blank_and_padded_entries() {
		assert_eq!(Scopes::new([""]), Err(ScopeValidationError::Empty));
		assert!(matches!(
			Scopes::new([" email "]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert!(Scopes::from_str("").is_ok_and(|scopes| scopes.is_empty()));
		assert!(Scopes::from_str("   ").is_err());
	}

	#[test]
	fn scopes_deserialize_with_validation() {
		let scopes: Scopes =
			serde_json::from_str("[\"email\",\"name\"]").expect("Scope list should deserialize.");

		assert_eq!(scopes.iter().collect::<Vec<_>>(), vec!["email", "name"]);
		assert!(serde_json::from_str::<Scopes>("[\"has space\"]").is_err());
	}
}
