//! Module API versions and the on-disk schema generations they select.
//!
//! A module declares the API it was written against in its descriptor. That
//! single number decides how every file the module produces is read:
//!
//! | API        | Generation     | BOM source      | Layer flags      | Default process |
//! |------------|----------------|-----------------|------------------|-----------------|
//! | < 0.5      | `Legacy`       | rewritten plan  | flat             | no              |
//! | 0.5        | `Transitional` | `build.toml`    | flat             | no              |
//! | >= 0.6     | `Current`      | `build.toml`    | nested `[types]` | yes             |
//!
//! The generation is resolved once per invocation and every component
//! dispatches on it instead of comparing version numbers itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when an API version string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid module API version '{0}': expected <major>.<minor>")]
pub struct ApiVersionError(pub String);

/// A `major.minor` module API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
  pub major: u32,
  pub minor: u32,
}

impl ApiVersion {
  pub const V0_2: ApiVersion = ApiVersion::new(0, 2);
  pub const V0_3: ApiVersion = ApiVersion::new(0, 3);
  pub const V0_4: ApiVersion = ApiVersion::new(0, 4);
  pub const V0_5: ApiVersion = ApiVersion::new(0, 5);
  pub const V0_6: ApiVersion = ApiVersion::new(0, 6);

  /// APIs this build core knows how to reconcile.
  pub const SUPPORTED: &'static [ApiVersion] = &[Self::V0_2, Self::V0_3, Self::V0_4, Self::V0_5, Self::V0_6];

  pub const fn new(major: u32, minor: u32) -> Self {
    Self { major, minor }
  }

  pub fn is_supported(&self) -> bool {
    Self::SUPPORTED.contains(self)
  }

  pub fn generation(&self) -> Generation {
    Generation::of(*self)
  }
}

impl fmt::Display for ApiVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}

impl FromStr for ApiVersion {
  type Err = ApiVersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || ApiVersionError(s.to_string());
    let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
    let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !is_number(major) || !is_number(minor) {
      return Err(invalid());
    }
    Ok(Self {
      major: major.parse().map_err(|_| invalid())?,
      minor: minor.parse().map_err(|_| invalid())?,
    })
  }
}

impl Serialize for ApiVersion {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ApiVersion {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

/// One of the historically incompatible output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
  /// BOM is read back from the plan the module rewrote; `met` is whatever
  /// the rewritten plan still lists.
  Legacy,
  /// BOM and unmet requirements come from `build.toml`; layer flags are flat.
  Transitional,
  /// Layer flags live in a `[types]` table, inert layers are ignored and a
  /// single default process may be declared.
  Current,
}

impl Generation {
  pub fn of(api: ApiVersion) -> Self {
    if api < ApiVersion::V0_5 {
      Generation::Legacy
    } else if api < ApiVersion::V0_6 {
      Generation::Transitional
    } else {
      Generation::Current
    }
  }

  pub fn layer_schema(self) -> LayerSchema {
    match self {
      Generation::Legacy | Generation::Transitional => LayerSchema::Flat,
      Generation::Current => LayerSchema::Nested,
    }
  }

  pub fn bom_from_plan(self) -> bool {
    matches!(self, Generation::Legacy)
  }

  pub fn supports_default_process(self) -> bool {
    matches!(self, Generation::Current)
  }
}

/// On-disk shape of a `<layer>.toml` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSchema {
  /// `build`, `launch` and `cache` sit next to `[metadata]`.
  Flat,
  /// The flags live in a `[types]` table; top-level flags are rejected.
  Nested,
}
