//! Test utilities for layerbuild-lib.
//!
//! Helpers for tests that need a logger they can inspect or a module whose
//! `bin/build` is a shell script.

use std::path::Path;
use std::sync::Mutex;

use crate::api::ApiVersion;
use crate::log::Logger;
use crate::module::ModuleDescriptor;

/// Logger that keeps every message for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
  messages: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
  fn record(&self, level: &'static str, msg: &str) {
    self.messages.lock().unwrap().push((level, msg.to_string()));
  }

  fn at(&self, level: &str) -> Vec<String> {
    self
      .messages
      .lock()
      .unwrap()
      .iter()
      .filter(|(l, _)| *l == level)
      .map(|(_, m)| m.clone())
      .collect()
  }

  pub fn warnings(&self) -> Vec<String> {
    self.at("warn")
  }

  pub fn debugs(&self) -> Vec<String> {
    self.at("debug")
  }
}

impl Logger for RecordingLogger {
  fn debug(&self, msg: &str) {
    self.record("debug", msg);
  }

  fn info(&self, msg: &str) {
    self.record("info", msg);
  }

  fn warn(&self, msg: &str) {
    self.record("warn", msg);
  }
}

/// Descriptor for a module rooted at `dir` without touching the filesystem.
pub fn descriptor(dir: &Path, api: ApiVersion) -> ModuleDescriptor {
  ModuleDescriptor {
    api,
    id: "example/node".to_string(),
    version: "1.0.0".to_string(),
    homepage: Some("https://example.com/node".to_string()),
    clear_env: false,
    dir: dir.to_path_buf(),
  }
}

/// Create `<dir>/bin/build` running `script` with `/bin/sh`.
///
/// The script receives the output directory, platform directory and plan
/// path as `$1`, `$2` and `$3`.
#[cfg(unix)]
pub fn write_build_script(dir: &Path, script: &str) {
  use std::os::unix::fs::PermissionsExt;

  let bin = dir.join("bin");
  std::fs::create_dir_all(&bin).unwrap();
  let path = bin.join("build");
  std::fs::write(&path, format!("#!/bin/sh\nset -e\n{script}\n")).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
