//! Identity keys: the derived grouping used to tell who is inside.
//!
//! There is no session record linking an entry to its exit. Instead every
//! event is projected onto the physical subject it most likely describes, and
//! occupancy is reconstructed per subject. The key is never stored; every
//! query that groups events goes through [`IdentityKey::derive`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Error, event::PersonCategory};

/// Precedence-ordered identity of a subject.
///
/// Vehicles outrank people: a plate groups the event even when an employee
/// number is also present, because the car re-enters the lot regardless of
/// who drives it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
  /// Uppercased, trimmed vehicle plate.
  Plate(String),
  /// Trimmed employee number; only for the employee category.
  Employee(String),
  /// Trimmed scanned-code payload.
  Code(String),
}

impl IdentityKey {
  /// Derive the key from the relevant event fields, or `None` if the event
  /// cannot be grouped.
  pub fn derive(
    plate: Option<&str>,
    category: PersonCategory,
    employee_number: Option<&str>,
    scanned_code: Option<&str>,
  ) -> Option<Self> {
    fn present(v: Option<&str>) -> Option<&str> {
      v.map(str::trim).filter(|v| !v.is_empty())
    }

    if let Some(plate) = present(plate) {
      return Some(Self::Plate(plate.to_uppercase()));
    }
    if category == PersonCategory::Employee
      && let Some(number) = present(employee_number)
    {
      return Some(Self::Employee(number.to_owned()));
    }
    present(scanned_code).map(|code| Self::Code(code.to_owned()))
  }

  fn prefix(&self) -> &'static str {
    match self {
      Self::Plate(_) => "P:",
      Self::Employee(_) => "E:",
      Self::Code(_) => "Q:",
    }
  }

  fn value(&self) -> &str {
    match self {
      Self::Plate(v) | Self::Employee(v) | Self::Code(v) => v,
    }
  }
}

/// Renders the canonical `P:`/`E:`/`Q:` string form.
impl fmt::Display for IdentityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.prefix(), self.value())
  }
}

impl FromStr for IdentityKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let unknown = || Error::UnknownVariant {
      kind:  "identity key",
      value: s.to_owned(),
    };
    let (prefix, value) = s.split_at_checked(2).ok_or_else(unknown)?;
    if value.is_empty() {
      return Err(unknown());
    }
    match prefix {
      "P:" => Ok(Self::Plate(value.to_owned())),
      "E:" => Ok(Self::Employee(value.to_owned())),
      "Q:" => Ok(Self::Code(value.to_owned())),
      _ => Err(unknown()),
    }
  }
}

impl Serialize for IdentityKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for IdentityKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
  }
}
