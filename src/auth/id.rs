//! Strongly typed identifiers: continuation tokens and federated provider tags.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, error::ConfigError};

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
const GENERATED_TOKEN_LEN: usize = 32;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! {
	ContinuationToken,
	"Correlation id linking a suspended sign-in call to its eventual platform result.",
	"ContinuationToken"
}
impl ContinuationToken {
	/// Generates a random alphanumeric token for hosts that do not supply their own.
	pub fn generate() -> Self {
		Self(rand::rng().sample_iter(Alphanumeric).take(GENERATED_TOKEN_LEN).map(char::from).collect())
	}
}

/// Federated identity providers supported by the handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Provider {
	/// Sign in with Apple (`apple.com`).
	Apple,
	/// GitHub (`github.com`).
	Github,
	/// Google via the native one-tap flow (`google.com`).
	Google,
	/// Microsoft (`microsoft.com`).
	Microsoft,
	/// Twitter (`twitter.com`).
	Twitter,
	/// Yahoo (`yahoo.com`).
	Yahoo,
}
impl Provider {
	/// Every supported provider, in declaration order.
	pub const ALL: [Provider; 6] = [
		Provider::Apple,
		Provider::Github,
		Provider::Google,
		Provider::Microsoft,
		Provider::Twitter,
		Provider::Yahoo,
	];

	/// Backend provider id used to route the credential exchange.
	pub const fn id(self) -> &'static str {
		match self {
			Provider::Apple => "apple.com",
			Provider::Github => "github.com",
			Provider::Google => "google.com",
			Provider::Microsoft => "microsoft.com",
			Provider::Twitter => "twitter.com",
			Provider::Yahoo => "yahoo.com",
		}
	}

	/// Returns `true` when the provider signs in through the native one-tap flow.
	pub const fn is_one_tap(self) -> bool {
		matches!(self, Provider::Google)
	}
}
impl Display for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.id())
	}
}
impl FromStr for Provider {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Provider::ALL
			.into_iter()
			.find(|provider| provider.id() == s)
			.ok_or_else(|| ConfigError::UnsupportedProvider { provider_id: s.to_owned() })
	}
}
impl TryFrom<String> for Provider {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl From<Provider> for String {
	fn from(value: Provider) -> Self {
		value.id().to_owned()
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
