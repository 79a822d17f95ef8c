//! Error types for a single module build.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

use crate::api::{ApiVersion, ApiVersionError};
use crate::env::EnvError;

/// Coarse classification of a [`BuildError`].
///
/// Callers use this to decide how a failure is reported: a `ModuleFailed`
/// error means third-party build code exited unsuccessfully, everything else
/// is a fault detected by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Io,
  SchemaViolation,
  ModuleFailed,
  Validation,
}

/// Errors that can occur while building one module.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Filesystem operation failed.
  #[error("failed to {action} '{}': {source}", path.display())]
  Io {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A TOML file could not be parsed into the expected shape.
  #[error("failed to decode '{}': {source}", path.display())]
  Decode {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  /// A value could not be serialized to TOML.
  #[error("failed to encode '{}': {source}", path.display())]
  Encode {
    path: PathBuf,
    #[source]
    source: toml::ser::Error,
  },

  /// The environment collaborator failed.
  #[error(transparent)]
  Env(#[from] EnvError),

  /// Top-level layer flags found where only a `[types]` table is allowed.
  #[error("the launch, cache and build flags should be in the types table of {}", path.display())]
  SchemaViolation { path: PathBuf },

  /// The module's build executable exited unsuccessfully.
  #[error("build executable of module '{module}' failed: {status}")]
  ModuleFailed { module: String, status: ExitStatus },

  #[error(transparent)]
  InvalidApi(#[from] ApiVersionError),

  #[error("module '{module}' declares unsupported API {api}")]
  UnsupportedApi { module: String, api: ApiVersion },

  #[error("bom entry '{name}' has no matching element in the module plan")]
  UnknownBomEntry { name: String },

  #[error("top level version does not match metadata version for bom entry '{name}'")]
  BomVersionMismatch { name: String },

  #[error("bom entry '{name}' has a top level version which is not allowed; the module should set metadata.version")]
  BomTopLevelVersion { name: String },

  #[error("unmet.name is required")]
  UnmetNameRequired,

  #[error("unmet.name '{name}' must match a requested dependency")]
  UnknownUnmet { name: String },

  #[error("multiple default process types aren't allowed: [{}]", types.join(", "))]
  MultipleDefaults { types: Vec<String> },
}

impl BuildError {
  pub(crate) fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
    BuildError::Io {
      action,
      path: path.as_ref().to_path_buf(),
      source,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      BuildError::Io { .. } | BuildError::Decode { .. } | BuildError::Encode { .. } | BuildError::Env(_) => {
        ErrorKind::Io
      }
      BuildError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
      BuildError::ModuleFailed { .. } => ErrorKind::ModuleFailed,
      BuildError::InvalidApi(_)
      | BuildError::UnsupportedApi { .. }
      | BuildError::UnknownBomEntry { .. }
      | BuildError::BomVersionMismatch { .. }
      | BuildError::BomTopLevelVersion { .. }
      | BuildError::UnmetNameRequired
      | BuildError::UnknownUnmet { .. }
      | BuildError::MultipleDefaults { .. } => ErrorKind::Validation,
    }
  }

  /// True when the failure came from the module's own build executable.
  pub fn is_module_fault(&self) -> bool {
    self.kind() == ErrorKind::ModuleFailed
  }
}
