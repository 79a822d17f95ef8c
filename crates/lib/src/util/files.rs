//! TOML file helpers shared by the build steps.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::BuildError;

/// Read and decode a TOML file. A missing file is an error.
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, BuildError> {
  let content = fs::read_to_string(path).map_err(|e| BuildError::io("read", path, e))?;
  decode(path, &content)
}

/// Read and decode a TOML file, returning `None` when it doesn't exist.
pub fn read_toml_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, BuildError> {
  match fs::read_to_string(path) {
    Ok(content) => decode(path, &content).map(Some),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(BuildError::io("read", path, e)),
  }
}

/// Encode a value as TOML and write it to `path`, replacing any existing file.
pub fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), BuildError> {
  let content = toml::to_string(value).map_err(|source| BuildError::Encode {
    path: path.to_path_buf(),
    source,
  })?;
  fs::write(path, content).map_err(|e| BuildError::io("write", path, e))
}

fn decode<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, BuildError> {
  toml::from_str(content).map_err(|source| BuildError::Decode {
    path: path.to_path_buf(),
    source,
  })
}
