//! Bill-of-materials reconciliation.
//!
//! A module declares the dependencies it actually provided as BOM entries.
//! Every entry must correspond to a requirement of the module's plan, and
//! the accepted entries are normalized before they leave this crate: the
//! module reference attached to each entry never carries the module's API
//! version or homepage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::{ApiVersion, Generation};
use crate::error::BuildError;
use crate::layer::LayerMetadata;
use crate::module::ModuleRef;
use crate::plan::{Plan, Requirement, version_string};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BomEntry {
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,
  #[serde(default, skip_serializing_if = "ModuleRef::is_empty")]
  pub module: ModuleRef,
  #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
  pub metadata: toml::Table,
}

impl From<Requirement> for BomEntry {
  fn from(req: Requirement) -> Self {
    Self {
      name: req.name,
      version: req.version,
      module: ModuleRef::default(),
      metadata: req.metadata,
    }
  }
}

impl BomEntry {
  fn convert_version_to_metadata(&mut self) {
    if !self.version.is_empty() {
      let version = std::mem::take(&mut self.version);
      self.metadata.insert("version".to_string(), toml::Value::String(version));
    }
  }
}

/// A requirement the module declined to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Unmet {
  #[serde(default)]
  pub name: String,
}

/// Contents of `build.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildToml {
  #[serde(default)]
  pub bom: Vec<BomEntry>,
  #[serde(default)]
  pub unmet: Vec<Unmet>,
}

/// BOM declared through a single layer's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomFile {
  pub layer_name: String,
  pub layer_path: PathBuf,
  pub entries: Vec<BomEntry>,
}

/// Validation rules for BOM entries, selected by module API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomValidator {
  /// API < 0.5: a top-level version must agree with `metadata.version` and
  /// is then moved into the metadata.
  Legacy,
  /// API >= 0.5: versions must be declared as `metadata.version`.
  Current,
}

impl BomValidator {
  pub fn for_api(api: ApiVersion) -> Self {
    match Generation::of(api) {
      Generation::Legacy => BomValidator::Legacy,
      Generation::Transitional | Generation::Current => BomValidator::Current,
    }
  }

  /// Check `bom` against `plan` and return the normalized entries.
  pub fn validate(&self, module: &ModuleRef, plan: &Plan, bom: Vec<BomEntry>) -> Result<Vec<BomEntry>, BuildError> {
    for entry in &bom {
      if !plan.contains(&entry.name) {
        return Err(BuildError::UnknownBomEntry {
          name: entry.name.clone(),
        });
      }
      self.validate_entry(entry)?;
    }

    let module = normalized(module);
    Ok(
      bom
        .into_iter()
        .map(|mut entry| {
          if *self == BomValidator::Legacy {
            entry.convert_version_to_metadata();
          }
          entry.module = module.clone();
          entry
        })
        .collect(),
    )
  }

  fn validate_entry(&self, entry: &BomEntry) -> Result<(), BuildError> {
    if entry.version.is_empty() {
      return Ok(());
    }
    match self {
      BomValidator::Legacy => match entry.metadata.get("version") {
        Some(version) if version_string(version) != entry.version => Err(BuildError::BomVersionMismatch {
          name: entry.name.clone(),
        }),
        _ => Ok(()),
      },
      BomValidator::Current => Err(BuildError::BomTopLevelVersion {
        name: entry.name.clone(),
      }),
    }
  }
}

/// Every unmet entry must be named and must appear in `plan`.
pub fn validate_unmet(unmet: &[Unmet], plan: &Plan) -> Result<(), BuildError> {
  for entry in unmet {
    if entry.name.is_empty() {
      return Err(BuildError::UnmetNameRequired);
    }
    if !plan.contains(&entry.name) {
      return Err(BuildError::UnknownUnmet {
        name: entry.name.clone(),
      });
    }
  }
  Ok(())
}

/// Names of the plan entries the module satisfied.
pub fn met_requirements(plan: &Plan, unmet: &[Unmet]) -> Result<Vec<String>, BuildError> {
  validate_unmet(unmet, plan)?;
  Ok(plan.filter(unmet).names())
}

/// Attribute each layer's metadata to that layer as a BOM file.
///
/// Layers without a payload contribute nothing. A table payload becomes the
/// entry's metadata as is; any other value is stored under `value`.
pub fn bom_files(module: &ModuleRef, layers: &BTreeMap<PathBuf, LayerMetadata>) -> Vec<BomFile> {
  let module = normalized(module);
  layers
    .iter()
    .filter_map(|(path, layer)| layer.payload().map(|payload| (path, payload)))
    .map(|(path, payload)| {
      let layer_name = layer_name(path);
      BomFile {
        entries: vec![BomEntry {
          name: layer_name.clone(),
          version: String::new(),
          module: module.clone(),
          metadata: payload_table(payload),
        }],
        layer_name,
        layer_path: path.clone(),
      }
    })
    .collect()
}

fn payload_table(payload: &toml::Value) -> toml::Table {
  match payload {
    toml::Value::Table(table) => table.clone(),
    other => {
      let mut table = toml::Table::new();
      table.insert("value".to_string(), other.clone());
      table
    }
  }
}

fn normalized(module: &ModuleRef) -> ModuleRef {
  module.clone().without_api().without_homepage()
}

fn layer_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default()
}
