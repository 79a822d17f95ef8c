//! Layer discovery after the build executable exits.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::{ApiVersion, LayerSchema};
use crate::env::{ActionType, BuildEnv};
use crate::error::BuildError;
use crate::layer::{LayerMetadata, decode_layer_metadata};
use crate::log::Logger;
use crate::module::ModuleDescriptor;

use super::outputs::{BUILD_FILE, LAUNCH_FILE};

const IGNORE_SUFFIX: &str = ".ignore";

/// Decode every `<layer>.toml` in `output_dir`, keyed by layer path.
///
/// With the nested schema, layers that are neither build, launch nor cache
/// are moved aside to `<layer>.ignore`.
pub fn process_layers(
  output_dir: &Path,
  descriptor: &ModuleDescriptor,
  logger: &dyn Logger,
) -> Result<BTreeMap<PathBuf, LayerMetadata>, BuildError> {
  let schema = descriptor.generation().layer_schema();
  let mut layers = BTreeMap::new();

  for layer_path in layer_paths(output_dir)? {
    let mut toml_path = layer_path.clone().into_os_string();
    toml_path.push(".toml");
    let decoded = decode_layer_metadata(Path::new(&toml_path), schema)?;

    if let Some(advisory) = &decoded.advisory {
      logger.warn(advisory);
    }
    if schema == LayerSchema::Nested && decoded.layer.is_inert() {
      ignore_layer(&layer_path)?;
    }

    debug!(
      layer = ?layer_path,
      build = decoded.layer.build,
      launch = decoded.layer.launch,
      cache = decoded.layer.cache,
      "processed layer"
    );
    layers.insert(layer_path, decoded.layer);
  }

  Ok(layers)
}

/// Expose every build layer to the remaining steps of the build.
pub fn setup_env(
  layers: &BTreeMap<PathBuf, LayerMetadata>,
  api: ApiVersion,
  env: &mut dyn BuildEnv,
) -> Result<(), BuildError> {
  let action = ActionType::default_for(api);
  for (path, layer) in layers {
    if !layer.build {
      continue;
    }
    env.add_root_dir(path)?;
    env.add_env_dir(&path.join("env"), action)?;
    env.add_env_dir(&path.join("env.build"), action)?;
  }
  Ok(())
}

/// Paths `<output>/<layer>` for each `<layer>.toml` file in `output_dir`.
fn layer_paths(output_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
  let entries = match fs::read_dir(output_dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(BuildError::io("read directory", output_dir, e)),
  };

  let mut paths = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|e| BuildError::io("read directory", output_dir, e))?;
    let file_type = entry
      .file_type()
      .map_err(|e| BuildError::io("inspect", entry.path(), e))?;
    if file_type.is_dir() {
      continue;
    }
    let file_name = entry.file_name();
    if file_name.as_os_str() == OsStr::new(LAUNCH_FILE) || file_name.as_os_str() == OsStr::new(BUILD_FILE) {
      continue;
    }
    let file_name = Path::new(&file_name);
    if file_name.extension() != Some(OsStr::new("toml")) {
      continue;
    }
    if let Some(layer) = file_name.file_stem() {
      paths.push(output_dir.join(layer));
    }
  }
  paths.sort();
  Ok(paths)
}

fn ignore_layer(layer_path: &Path) -> Result<(), BuildError> {
  let mut target = layer_path.as_os_str().to_owned();
  target.push(IGNORE_SUFFIX);
  match fs::rename(layer_path, &target) {
    Ok(()) => {
      debug!(layer = ?layer_path, "ignoring inert layer");
      Ok(())
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(BuildError::io("rename", layer_path, e)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::env::Env;
  use crate::error::ErrorKind;
  use crate::layer::TYPES_TABLE_IGNORED;
  use crate::util::testutil::{RecordingLogger, descriptor};
  use tempfile::TempDir;

  fn layer(dir: &Path, name: &str, toml: &str) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(&path).unwrap();
    fs::write(dir.join(format!("{name}.toml")), toml).unwrap();
    path
  }

  #[test]
  fn missing_output_dir_has_no_layers() {
    let temp = TempDir::new().unwrap();
    let logger = RecordingLogger::default();
    let module = descriptor(temp.path(), ApiVersion::V0_6);

    let layers = process_layers(&temp.path().join("missing"), &module, &logger).unwrap();
    assert!(layers.is_empty());
  }

  #[test]
  fn output_files_and_directories_are_not_layers() {
    let temp = TempDir::new().unwrap();
    let out = temp.path();
    fs::write(out.join(LAUNCH_FILE), "").unwrap();
    fs::write(out.join(BUILD_FILE), "").unwrap();
    fs::create_dir_all(out.join("dir.toml")).unwrap();
    fs::write(out.join("notes.txt"), "").unwrap();
    let node = layer(out, "node", "[types]\nlaunch = true\n");

    let logger = RecordingLogger::default();
    let layers = process_layers(out, &descriptor(out, ApiVersion::V0_6), &logger).unwrap();

    assert_eq!(layers.keys().collect::<Vec<_>>(), vec![&node]);
  }

  #[cfg(target_os = "linux")]
  #[test]
  fn non_utf8_layer_names_keep_their_bytes() {
    use std::os::unix::ffi::OsStrExt;

    let temp = TempDir::new().unwrap();
    let out = temp.path();
    let name = OsStr::from_bytes(b"caf\xe9");
    let mut toml_name = name.to_os_string();
    toml_name.push(".toml");
    fs::create_dir_all(out.join(name)).unwrap();
    fs::write(out.join(&toml_name), "[types]\nbuild = true\n").unwrap();
    let inert = OsStr::from_bytes(b"tmp\xff");
    let mut inert_toml = inert.to_os_string();
    inert_toml.push(".toml");
    fs::create_dir_all(out.join(inert)).unwrap();
    fs::write(out.join(&inert_toml), "[types]\n").unwrap();

    let logger = RecordingLogger::default();
    let layers = process_layers(out, &descriptor(out, ApiVersion::V0_6), &logger).unwrap();

    assert!(layers[&out.join(name)].build);
    assert!(layers[&out.join(inert)].is_inert());
    let mut ignored = inert.to_os_string();
    ignored.push(".ignore");
    assert!(out.join(ignored).is_dir());
    assert!(!out.join(inert).exists());
  }

  #[test]
  fn cache_only_layer_is_kept() {
    let temp = TempDir::new().unwrap();
    let cache = layer(temp.path(), "cache", "[types]\ncache = true\n");

    let logger = RecordingLogger::default();
    let layers = process_layers(temp.path(), &descriptor(temp.path(), ApiVersion::V0_6), &logger).unwrap();

    assert!(layers[&cache].cache);
    assert!(cache.is_dir());
    assert!(!temp.path().join("cache.ignore").exists());
  }

  #[test]
  fn inert_layer_is_renamed_once() {
    let temp = TempDir::new().unwrap();
    let inert = layer(temp.path(), "inert", "[metadata]\nkey = \"value\"\n");
    let module = descriptor(temp.path(), ApiVersion::V0_6);
    let logger = RecordingLogger::default();

    let layers = process_layers(temp.path(), &module, &logger).unwrap();
    assert!(layers[&inert].is_inert());
    assert!(!inert.exists());
    assert!(temp.path().join("inert.ignore").is_dir());

    // The layer directory is gone; renaming again must not fail.
    let again = process_layers(temp.path(), &module, &logger).unwrap();
    assert!(again.contains_key(&inert));
    assert!(temp.path().join("inert.ignore").is_dir());
    assert!(!temp.path().join("inert.ignore.ignore").exists());
  }

  #[test]
  fn flat_schema_keeps_inert_layers_and_warns_on_types() {
    let temp = TempDir::new().unwrap();
    let inert = layer(temp.path(), "inert", "[types]\nbuild = true\n");
    let logger = RecordingLogger::default();

    let layers = process_layers(temp.path(), &descriptor(temp.path(), ApiVersion::V0_5), &logger).unwrap();

    assert!(layers[&inert].is_inert());
    assert!(inert.is_dir());
    assert_eq!(logger.warnings(), vec![TYPES_TABLE_IGNORED.to_string()]);
  }

  #[test]
  fn nested_schema_violation_fails() {
    let temp = TempDir::new().unwrap();
    layer(temp.path(), "bad", "launch = true\n");
    let logger = RecordingLogger::default();

    let err = process_layers(temp.path(), &descriptor(temp.path(), ApiVersion::V0_6), &logger).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
  }

  #[test]
  fn build_layers_extend_env() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    fs::create_dir_all(build.join("bin")).unwrap();
    fs::create_dir_all(build.join("env")).unwrap();
    fs::create_dir_all(build.join("env.build")).unwrap();
    fs::write(build.join("env").join("FROM_ENV"), "one").unwrap();
    fs::write(build.join("env.build").join("FROM_ENV.override"), "two").unwrap();

    let launch_only = temp.path().join("launch");
    fs::create_dir_all(launch_only.join("env")).unwrap();
    fs::write(launch_only.join("env").join("LAUNCH_ONLY"), "x").unwrap();

    let mut layers = BTreeMap::new();
    layers.insert(
      build.clone(),
      LayerMetadata {
        build: true,
        ..Default::default()
      },
    );
    layers.insert(
      launch_only,
      LayerMetadata {
        launch: true,
        ..Default::default()
      },
    );

    let mut env = Env::default();
    setup_env(&layers, ApiVersion::V0_6, &mut env).unwrap();

    assert_eq!(env.get("PATH").unwrap(), build.join("bin").to_string_lossy());
    assert_eq!(env.get("FROM_ENV"), Some("two"));
    assert_eq!(env.get("LAUNCH_ONLY"), None);
  }

  #[test]
  fn old_api_env_files_prepend_as_paths() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    fs::create_dir_all(build.join("env")).unwrap();
    fs::write(build.join("env").join("PATH"), "/layer/bin").unwrap();

    let mut layers = BTreeMap::new();
    layers.insert(
      build,
      LayerMetadata {
        build: true,
        ..Default::default()
      },
    );

    let mut env = Env::new_build([("PATH", "/usr/bin")]);
    setup_env(&layers, ApiVersion::V0_4, &mut env).unwrap();

    assert_eq!(
      env.get("PATH").unwrap(),
      format!("/layer/bin{}/usr/bin", crate::env::PATH_LIST_SEPARATOR)
    );
  }
}
