//! Launch configuration declared by a module in `launch.toml`.

use serde::{Deserialize, Serialize};

use crate::bom::BomEntry;
use crate::error::BuildError;
use crate::log::Logger;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Process {
  #[serde(default, rename = "type")]
  pub process_type: String,
  #[serde(default)]
  pub command: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default)]
  pub direct: bool,
  #[serde(default)]
  pub default: bool,
  /// Owning module, stamped by the build core.
  #[serde(default, rename = "module-id", skip_serializing_if = "String::is_empty")]
  pub module_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Label {
  #[serde(default)]
  pub key: String,
  #[serde(default)]
  pub value: String,
}

/// A set of application files exported as their own image layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slice {
  #[serde(default)]
  pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LaunchToml {
  #[serde(default)]
  pub bom: Vec<BomEntry>,
  #[serde(default)]
  pub labels: Vec<Label>,
  #[serde(default)]
  pub processes: Vec<Process>,
  #[serde(default)]
  pub slices: Vec<Slice>,
}

/// Clear every default flag for modules that predate default processes.
///
/// Returns the process types whose flag was reset; one advisory naming all
/// of them is logged.
pub fn override_defaults(processes: &mut [Process], logger: &dyn Logger) -> Vec<String> {
  let mut replaced = Vec::new();
  for process in processes.iter_mut() {
    if process.default {
      replaced.push(process.process_type.clone());
    }
    process.default = false;
  }
  if !replaced.is_empty() {
    logger.warn(&format!(
      "Warning: default processes aren't supported in this module API version. Overriding the default value to false for the following processes: [{}]",
      replaced.join(", ")
    ));
  }
  replaced
}

/// At most one process may be the default.
pub fn validate_no_multiple_defaults(processes: &[Process]) -> Result<(), BuildError> {
  let defaults: Vec<String> = processes
    .iter()
    .filter(|p| p.default)
    .map(|p| p.process_type.clone())
    .collect();
  if defaults.len() > 1 {
    return Err(BuildError::MultipleDefaults { types: defaults });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::RecordingLogger;
  use proptest::prelude::*;

  fn process(process_type: &str, default: bool) -> Process {
    Process {
      process_type: process_type.into(),
      command: format!("run-{process_type}"),
      default,
      ..Default::default()
    }
  }

  #[test]
  fn override_clears_defaults_with_one_advisory() {
    let logger = RecordingLogger::default();
    let mut processes = vec![process("web", true), process("worker", false)];

    let replaced = override_defaults(&mut processes, &logger);

    assert_eq!(replaced, vec!["web".to_string()]);
    assert!(processes.iter().all(|p| !p.default));
    let warnings = logger.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("[web]"));
  }

  #[test]
  fn override_without_defaults_is_silent() {
    let logger = RecordingLogger::default();
    let mut processes = vec![process("web", false)];
    assert!(override_defaults(&mut processes, &logger).is_empty());
    assert!(logger.warnings().is_empty());
  }

  #[test]
  fn single_default_is_allowed() {
    assert!(validate_no_multiple_defaults(&[process("web", true), process("worker", false)]).is_ok());
  }

  #[test]
  fn launch_toml_shape() {
    let launch: LaunchToml = toml::from_str(
      r#"
[[labels]]
key = "maintainer"
value = "team"

[[processes]]
type = "web"
command = "node server.js"
args = ["--port", "8080"]
default = true

[[slices]]
paths = ["static/*"]
"#,
    )
    .unwrap();

    assert_eq!(launch.labels[0].key, "maintainer");
    assert_eq!(launch.processes[0].process_type, "web");
    assert_eq!(launch.processes[0].args, vec!["--port", "8080"]);
    assert!(launch.processes[0].default);
    assert!(!launch.processes[0].direct);
    assert!(launch.processes[0].module_id.is_empty());
    assert_eq!(launch.slices[0].paths, vec!["static/*"]);
    assert!(launch.bom.is_empty());
  }

  #[test]
  fn partial_entries_default_to_empty() {
    let launch: LaunchToml = toml::from_str(
      r#"
[[labels]]
key = "maintainer"

[[processes]]
type = "web"

[[processes]]
command = "worker.sh"
default = true
"#,
    )
    .unwrap();

    assert_eq!(launch.labels[0].value, "");
    assert_eq!(launch.processes[0].process_type, "web");
    assert!(launch.processes[0].command.is_empty());
    assert!(launch.processes[1].process_type.is_empty());
    assert_eq!(launch.processes[1].command, "worker.sh");
    assert!(launch.processes[1].default);
  }

  proptest! {
    #[test]
    fn multiple_defaults_fail_regardless_of_order(flags in proptest::collection::vec(any::<bool>(), 0..8)) {
      let processes: Vec<Process> = flags
        .iter()
        .enumerate()
        .map(|(i, default)| process(&format!("p{i}"), *default))
        .collect();
      let defaults = flags.iter().filter(|d| **d).count();

      match validate_no_multiple_defaults(&processes) {
        Ok(()) => prop_assert!(defaults <= 1),
        Err(BuildError::MultipleDefaults { types }) => prop_assert_eq!(types.len(), defaults),
        Err(other) => prop_assert!(false, "unexpected error: {}", other),
      }
    }
  }
}
