//! Module plans.
//!
//! The plan is the list of requirements the detection stage asked a module to
//! provide. It is written to `plan.toml` before the build executable runs:
//!
//! ```toml
//! [[entries]]
//! name = "node"
//! version = "14"
//!
//! [entries.metadata]
//! launch = true
//! ```

use serde::{Deserialize, Serialize};

use crate::api::ApiVersion;
use crate::bom::{BomEntry, Unmet};

/// A single requirement the module was asked to satisfy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Requirement {
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,
  #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
  pub metadata: toml::Table,
}

impl Requirement {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_version(mut self, version: impl Into<String>) -> Self {
    self.version = version.into();
    self
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
    self.metadata.insert(key.into(), value.into());
    self
  }

  /// Lift `metadata.version` to the top-level version.
  pub fn convert_metadata_to_version(&mut self) {
    if let Some(version) = self.metadata.remove("version") {
      self.version = version_string(&version);
    }
  }
}

/// Render a `metadata.version` value as a plain version string.
pub(crate) fn version_string(value: &toml::Value) -> String {
  match value {
    toml::Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
  #[serde(default)]
  pub entries: Vec<Requirement>,
}

impl Plan {
  pub fn new(entries: Vec<Requirement>) -> Self {
    Self { entries }
  }

  /// Rewrite entries into the shape the declared API expects.
  ///
  /// Modules on API 0.2 read the requirement version from the top level.
  pub fn normalize_for(&mut self, api: ApiVersion) {
    if api == ApiVersion::V0_2 {
      for entry in &mut self.entries {
        entry.convert_metadata_to_version();
      }
    }
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.iter().any(|entry| entry.name == name)
  }

  pub fn names(&self) -> Vec<String> {
    self.entries.iter().map(|entry| entry.name.clone()).collect()
  }

  /// Entries whose names are not listed in `unmet`.
  pub fn filter(&self, unmet: &[Unmet]) -> Plan {
    Plan {
      entries: self
        .entries
        .iter()
        .filter(|entry| !unmet.iter().any(|u| u.name == entry.name))
        .cloned()
        .collect(),
    }
  }

  pub fn to_bom(&self) -> Vec<BomEntry> {
    self.entries.iter().cloned().map(BomEntry::from).collect()
  }
}
