//! Module descriptors.
//!
//! A module lives in its own root directory containing `buildpack.toml` and
//! the `bin/build` executable:
//!
//! ```toml
//! api = "0.6"
//!
//! [buildpack]
//! id = "example/node"
//! version = "1.2.3"
//! homepage = "https://example.com/node"
//! clear-env = false
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::{ApiVersion, Generation};
use crate::error::BuildError;
use crate::util::files::read_toml;

/// Name of the descriptor file inside a module's root directory.
pub const DESCRIPTOR_FILE: &str = "buildpack.toml";

/// Identity of a module as recorded on the entries it contributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleRef {
  pub id: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api: Option<ApiVersion>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub homepage: Option<String>,
}

impl ModuleRef {
  pub fn without_api(self) -> Self {
    Self { api: None, ..self }
  }

  pub fn without_homepage(self) -> Self {
    Self { homepage: None, ..self }
  }

  pub fn is_empty(&self) -> bool {
    self.id.is_empty() && self.version.is_empty() && self.api.is_none() && self.homepage.is_none()
  }
}

/// Everything the build core needs to know about one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
  pub api: ApiVersion,
  pub id: String,
  pub version: String,
  pub homepage: Option<String>,
  pub clear_env: bool,
  /// Root directory of the module.
  pub dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DescriptorFile {
  api: ApiVersion,
  buildpack: DescriptorInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DescriptorInfo {
  id: String,
  version: String,
  #[serde(default)]
  homepage: Option<String>,
  #[serde(default)]
  clear_env: bool,
}

impl ModuleDescriptor {
  /// Read `buildpack.toml` from a module root directory.
  pub fn read(dir: &Path) -> Result<Self, BuildError> {
    let file: DescriptorFile = read_toml(&dir.join(DESCRIPTOR_FILE))?;
    Ok(Self {
      api: file.api,
      id: file.buildpack.id,
      version: file.buildpack.version,
      homepage: file.buildpack.homepage,
      clear_env: file.buildpack.clear_env,
      dir: dir.to_path_buf(),
    })
  }

  /// Reject modules written against an API this crate cannot reconcile.
  pub fn ensure_supported(&self) -> Result<(), BuildError> {
    if self.api.is_supported() {
      Ok(())
    } else {
      Err(BuildError::UnsupportedApi {
        module: self.id.clone(),
        api: self.api,
      })
    }
  }

  pub fn generation(&self) -> Generation {
    self.api.generation()
  }

  pub fn module_ref(&self) -> ModuleRef {
    ModuleRef {
      id: self.id.clone(),
      version: self.version.clone(),
      api: Some(self.api),
      homepage: self.homepage.clone(),
    }
  }
}

impl fmt::Display for ModuleDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.id, self.version)
  }
}
