//! Build environment composition.
//!
//! [`BuildEnv`] is the narrow interface the build steps call: layers add their
//! root directories and `env` directories, and the command runner asks for
//! the final variable list. [`Env`] is the implementation used in production.
//!
//! # Env directories
//!
//! Every file in an env directory contributes one variable. The file name is
//! `NAME` or `NAME.<action>`, the file content is the value:
//!
//! - `NAME.override` replaces the current value
//! - `NAME.default` sets the value only when it is unset or empty
//! - `NAME.prepend` / `NAME.append` join with the current value using the
//!   content of `NAME.delim` (empty when absent)
//! - `NAME` uses the default action chosen for the module's API

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::api::ApiVersion;

#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: &str = ":";

/// Subdirectories of a layer mapped onto the variables they extend.
const ROOT_DIR_MAP: &[(&str, &[&str])] = &[
  ("bin", &["PATH"]),
  ("lib", &["LD_LIBRARY_PATH", "LIBRARY_PATH"]),
  ("include", &["CPATH"]),
  ("lib/pkgconfig", &["PKG_CONFIG_PATH"]),
];

/// Process variables kept when a build environment is created.
const BUILD_ENV_INCLUDE_LIST: &[&str] = &[
  "CNB_STACK_ID",
  "HOSTNAME",
  "HOME",
  "HTTPS_PROXY",
  "https_proxy",
  "HTTP_PROXY",
  "http_proxy",
  "NO_PROXY",
  "no_proxy",
];

#[derive(Debug, Error)]
pub enum EnvError {
  #[error("failed to read env directory '{}': {source}", path.display())]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read env file '{}': {source}", path.display())]
  ReadFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// How an env file combines with the existing value of its variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
  Override,
  Default,
  Prepend,
  Append,
  /// Prepend using the OS path-list separator unless a delimiter is given.
  PrependPath,
}

impl ActionType {
  /// Action applied to env files without a suffix.
  pub fn default_for(api: ApiVersion) -> Self {
    if api < ApiVersion::V0_5 {
      ActionType::PrependPath
    } else {
      ActionType::Override
    }
  }
}

impl FromStr for ActionType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "override" => Ok(ActionType::Override),
      "default" => Ok(ActionType::Default),
      "prepend" => Ok(ActionType::Prepend),
      "append" => Ok(ActionType::Append),
      other => Err(format!("unknown env action '{other}'")),
    }
  }
}

impl fmt::Display for ActionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ActionType::Override => "override",
      ActionType::Default => "default",
      ActionType::Prepend => "prepend",
      ActionType::Append => "append",
      ActionType::PrependPath => "prepend-path",
    };
    f.write_str(name)
  }
}

/// The environment operations the build steps depend on.
pub trait BuildEnv {
  /// Expose `bin`, `lib`, `include` and `lib/pkgconfig` under `dir`.
  fn add_root_dir(&mut self, dir: &Path) -> Result<(), EnvError>;

  /// Apply every env file in `dir`. A missing directory is ignored.
  fn add_env_dir(&mut self, dir: &Path, default_action: ActionType) -> Result<(), EnvError>;

  /// Current variables overlaid with `<platform_dir>/env`.
  fn with_platform(&self, platform_dir: &Path) -> Result<Vec<(String, String)>, EnvError>;

  /// Current variables, sorted by name.
  fn list(&self) -> Vec<(String, String)>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
  vars: BTreeMap<String, String>,
}

impl Env {
  /// Create a build environment from `environ`, keeping only the include
  /// list and the variables layers may extend.
  pub fn new_build<I, K, V>(environ: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let vars = environ
      .into_iter()
      .map(|(k, v)| -> (String, String) { (k.into(), v.into()) })
      .filter(|(k, _)| BUILD_ENV_INCLUDE_LIST.contains(&k.as_str()) || is_root_var(k))
      .collect();
    Self { vars }
  }

  pub fn from_process() -> Self {
    Self::new_build(std::env::vars())
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.vars.get(name).map(String::as_str)
  }

  pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(name.into(), value.into());
  }

  fn current(&self, name: &str) -> Option<&str> {
    self.get(name).filter(|v| !v.is_empty())
  }

  fn prepend(&mut self, name: &str, value: &str, delim: &str) {
    let joined = match self.current(name) {
      Some(existing) => format!("{value}{delim}{existing}"),
      None => value.to_string(),
    };
    self.set(name, joined);
  }

  fn append(&mut self, name: &str, value: &str, delim: &str) {
    let joined = match self.current(name) {
      Some(existing) => format!("{existing}{delim}{value}"),
      None => value.to_string(),
    };
    self.set(name, joined);
  }

  fn apply(&mut self, dir: &Path, name: &str, value: &str, action: ActionType) -> Result<(), EnvError> {
    match action {
      ActionType::Override => self.set(name, value),
      ActionType::Default => {
        if self.current(name).is_none() {
          self.set(name, value);
        }
      }
      ActionType::Prepend => {
        let delim = read_delim(dir, name)?.unwrap_or_default();
        self.prepend(name, value, &delim);
      }
      ActionType::Append => {
        let delim = read_delim(dir, name)?.unwrap_or_default();
        self.append(name, value, &delim);
      }
      ActionType::PrependPath => {
        let delim = read_delim(dir, name)?.unwrap_or_else(|| PATH_LIST_SEPARATOR.to_string());
        self.prepend(name, value, &delim);
      }
    }
    Ok(())
  }
}

impl BuildEnv for Env {
  fn add_root_dir(&mut self, dir: &Path) -> Result<(), EnvError> {
    for (subdir, names) in ROOT_DIR_MAP {
      let path = dir.join(subdir);
      if !path.is_dir() {
        continue;
      }
      let value = path.to_string_lossy();
      for name in *names {
        self.prepend(name, &value, PATH_LIST_SEPARATOR);
      }
    }
    Ok(())
  }

  fn add_env_dir(&mut self, dir: &Path, default_action: ActionType) -> Result<(), EnvError> {
    for (file_name, path) in env_files(dir)? {
      let (name, action) = match file_name.split_once('.') {
        None => (file_name.as_str(), default_action),
        Some((_, "delim")) => continue,
        Some((name, suffix)) => match suffix.parse() {
          Ok(action) => (name, action),
          Err(reason) => {
            debug!(path = ?path, %reason, "skipping env file");
            continue;
          }
        },
      };
      let value = read_env_file(&path)?;
      self.apply(dir, name, &value, action)?;
    }
    Ok(())
  }

  fn with_platform(&self, platform_dir: &Path) -> Result<Vec<(String, String)>, EnvError> {
    let mut env = self.clone();
    for (name, path) in env_files(&platform_dir.join("env"))? {
      let value = read_env_file(&path)?;
      if is_root_var(&name) {
        env.prepend(&name, &value, PATH_LIST_SEPARATOR);
      } else {
        env.set(name, value);
      }
    }
    Ok(env.list())
  }

  fn list(&self) -> Vec<(String, String)> {
    self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
  }
}

fn is_root_var(name: &str) -> bool {
  ROOT_DIR_MAP.iter().any(|(_, names)| names.contains(&name))
}

/// Regular files in `dir` sorted by name. A missing directory has none.
fn env_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, EnvError> {
  let read_dir_err = |source| EnvError::ReadDir {
    path: dir.to_path_buf(),
    source,
  };
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(read_dir_err(e)),
  };

  let mut files = Vec::new();
  for entry in entries {
    let entry = entry.map_err(read_dir_err)?;
    if entry.file_type().map_err(read_dir_err)?.is_dir() {
      continue;
    }
    files.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
  }
  files.sort();
  Ok(files)
}

fn read_env_file(path: &Path) -> Result<String, EnvError> {
  fs::read_to_string(path).map_err(|source| EnvError::ReadFile {
    path: path.to_path_buf(),
    source,
  })
}

fn read_delim(dir: &Path, name: &str) -> Result<Option<String>, EnvError> {
  let path = dir.join(format!("{name}.delim"));
  match fs::read_to_string(&path) {
    Ok(delim) => Ok(Some(delim)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(EnvError::ReadFile { path, source }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
  }

  #[test]
  fn new_build_filters_process_env() {
    let env = Env::new_build([("HOME", "/home/cnb"), ("PATH", "/usr/bin"), ("SECRET", "x")]);
    assert_eq!(env.get("HOME"), Some("/home/cnb"));
    assert_eq!(env.get("PATH"), Some("/usr/bin"));
    assert_eq!(env.get("SECRET"), None);
  }

  #[test]
  fn add_root_dir_prepends_existing_subdirs() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("bin")).unwrap();
    fs::create_dir_all(temp.path().join("lib")).unwrap();

    let mut env = Env::new_build([("PATH", "/usr/bin")]);
    env.add_root_dir(temp.path()).unwrap();

    let bin = temp.path().join("bin");
    let lib = temp.path().join("lib");
    assert_eq!(
      env.get("PATH").unwrap(),
      format!("{}{}/usr/bin", bin.display(), PATH_LIST_SEPARATOR)
    );
    assert_eq!(env.get("LD_LIBRARY_PATH").unwrap(), lib.to_string_lossy());
    assert_eq!(env.get("LIBRARY_PATH").unwrap(), lib.to_string_lossy());
    assert_eq!(env.get("CPATH"), None);
  }

  #[test]
  fn env_dir_actions() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("env");
    write(&dir, "OVERRIDE.override", "new");
    write(&dir, "DEFAULT_SET.default", "ignored");
    write(&dir, "DEFAULT_UNSET.default", "fallback");
    write(&dir, "PRE.prepend", "a");
    write(&dir, "PRE.delim", ",");
    write(&dir, "APP.append", "z");
    write(&dir, "PLAIN", "value");
    write(&dir, "ODD.unknown", "skipped");

    let mut env = Env::default();
    env.set("OVERRIDE", "old");
    env.set("DEFAULT_SET", "kept");
    env.set("PRE", "b");
    env.set("APP", "y");
    env.add_env_dir(&dir, ActionType::Override).unwrap();

    assert_eq!(env.get("OVERRIDE"), Some("new"));
    assert_eq!(env.get("DEFAULT_SET"), Some("kept"));
    assert_eq!(env.get("DEFAULT_UNSET"), Some("fallback"));
    assert_eq!(env.get("PRE"), Some("a,b"));
    assert_eq!(env.get("APP"), Some("yz"));
    assert_eq!(env.get("PLAIN"), Some("value"));
    assert_eq!(env.get("ODD"), None);
  }

  #[test]
  fn prepend_path_default_uses_path_separator() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("env");
    write(&dir, "PATH", "/layer/bin");

    let mut env = Env::new_build([("PATH", "/usr/bin")]);
    env.add_env_dir(&dir, ActionType::PrependPath).unwrap();

    assert_eq!(
      env.get("PATH").unwrap(),
      format!("/layer/bin{}/usr/bin", PATH_LIST_SEPARATOR)
    );
  }

  #[test]
  fn missing_env_dir_is_noop() {
    let temp = TempDir::new().unwrap();
    let mut env = Env::default();
    env.add_env_dir(&temp.path().join("missing"), ActionType::Override).unwrap();
    assert!(env.list().is_empty());
  }

  #[test]
  fn with_platform_overlays_platform_env() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("env");
    write(&dir, "PATH", "/platform/bin");
    write(&dir, "FOO", "bar");

    let env = Env::new_build([("PATH", "/usr/bin"), ("HOME", "/home")]);
    let vars = env.with_platform(temp.path()).unwrap();

    let path = format!("/platform/bin{}/usr/bin", PATH_LIST_SEPARATOR);
    assert_eq!(
      vars,
      vec![
        ("FOO".to_string(), "bar".to_string()),
        ("HOME".to_string(), "/home".to_string()),
        ("PATH".to_string(), path),
      ]
    );
    // the builder itself is untouched
    assert_eq!(env.get("FOO"), None);
  }

  #[test]
  fn default_action_by_api() {
    assert_eq!(ActionType::default_for(ApiVersion::V0_4), ActionType::PrependPath);
    assert_eq!(ActionType::default_for(ApiVersion::V0_5), ActionType::Override);
    assert_eq!(ActionType::default_for(ApiVersion::V0_6), ActionType::Override);
  }
}
