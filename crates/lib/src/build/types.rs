//! Types shared by the build steps.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bom::{BomEntry, BomFile};
use crate::launch::{Label, Process, Slice};

/// Directories a single module build runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteConfig {
  /// Working directory of the build executable.
  pub app_dir: PathBuf,
  pub platform_dir: PathBuf,
  /// Root under which each module gets its own output directory.
  pub layers_dir: PathBuf,
}

/// Everything a module build contributes to later stages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildResult {
  pub bom: Vec<BomEntry>,
  pub bom_files: Vec<BomFile>,
  pub labels: Vec<Label>,
  pub met_requires: Vec<String>,
  pub processes: Vec<Process>,
  pub slices: Vec<Slice>,
}

/// Progress of a single build invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
  Prepared,
  Executed,
  LayersProcessed,
  EnvUpdated,
  Reconciled,
}

impl fmt::Display for BuildPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      BuildPhase::Prepared => "prepared",
      BuildPhase::Executed => "executed",
      BuildPhase::LayersProcessed => "layers processed",
      BuildPhase::EnvUpdated => "environment updated",
      BuildPhase::Reconciled => "reconciled",
    };
    f.write_str(name)
  }
}
