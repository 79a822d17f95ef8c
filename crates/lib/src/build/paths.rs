//! Per-invocation working area.
//!
//! Each build gets a private temporary directory holding its plan file and a
//! module-scoped output directory under the layers root. The temporary
//! directory is removed when [`PreparedPaths`] is dropped, whichever way the
//! build ends.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::BuildError;
use crate::plan::Plan;
use crate::util::files::write_toml;

pub const PLAN_FILE: &str = "plan.toml";

#[derive(Debug)]
pub struct PreparedPaths {
  /// Holds `<escaped-id>/plan.toml`; removed on drop.
  pub temp_dir: TempDir,
  /// `<output-root>/<escaped-id>`, handed to the module as its output.
  pub output_dir: PathBuf,
  pub plan_path: PathBuf,
}

/// Percent-encode every byte of `id` that is not ASCII alphanumeric.
pub fn escape_id(id: &str) -> String {
  let mut escaped = String::with_capacity(id.len());
  for byte in id.bytes() {
    if byte.is_ascii_alphanumeric() {
      escaped.push(char::from(byte));
    } else {
      escaped.push_str(&format!("%{byte:02X}"));
    }
  }
  escaped
}

/// Write `plan` into a fresh temporary directory and create the module's
/// output directory under `output_root`.
pub fn prepare_build_paths(output_root: &Path, module_id: &str, plan: &Plan) -> Result<PreparedPaths, BuildError> {
  let dir_name = escape_id(module_id);

  let temp_dir = tempfile::Builder::new()
    .prefix(&format!("{dir_name}-"))
    .tempdir()
    .map_err(|e| BuildError::io("create temporary directory for", &dir_name, e))?;

  let plan_dir = temp_dir.path().join(&dir_name);
  fs::create_dir_all(&plan_dir).map_err(|e| BuildError::io("create directory", &plan_dir, e))?;
  let plan_path = plan_dir.join(PLAN_FILE);
  write_toml(&plan_path, plan)?;

  let output_dir = output_root.join(&dir_name);
  fs::create_dir_all(&output_dir).map_err(|e| BuildError::io("create directory", &output_dir, e))?;

  debug!(plan = ?plan_path, output = ?output_dir, "prepared build paths");

  Ok(PreparedPaths {
    temp_dir,
    output_dir,
    plan_path,
  })
}
