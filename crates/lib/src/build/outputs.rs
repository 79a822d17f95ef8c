//! Reading the files a module leaves in its output directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::Generation;
use crate::bom::{BomValidator, BuildToml, bom_files, met_requirements};
use crate::error::BuildError;
use crate::launch::{LaunchToml, override_defaults, validate_no_multiple_defaults};
use crate::layer::LayerMetadata;
use crate::log::Logger;
use crate::module::ModuleDescriptor;
use crate::plan::Plan;
use crate::util::files::{read_toml, read_toml_opt};

use super::BuildResult;

pub const LAUNCH_FILE: &str = "launch.toml";
pub const BUILD_FILE: &str = "build.toml";

/// Assemble the build result from the module's outputs.
///
/// `plan` is the plan as handed to the module, before any rewriting by the
/// module itself.
pub fn read_output_files(
  output_dir: &Path,
  plan_path: &Path,
  plan: &Plan,
  layers: &BTreeMap<PathBuf, LayerMetadata>,
  descriptor: &ModuleDescriptor,
  logger: &dyn Logger,
) -> Result<BuildResult, BuildError> {
  let generation = descriptor.generation();
  let module = descriptor.module_ref();
  let validator = BomValidator::for_api(descriptor.api);
  let launch_path = output_dir.join(LAUNCH_FILE);

  let mut result = BuildResult::default();
  let launch: Option<LaunchToml>;

  if generation.bom_from_plan() {
    let rewritten: Plan = read_toml(plan_path)?;
    result.bom = validator.validate(&module, plan, rewritten.to_bom())?;
    result.met_requires = rewritten.names();
    result.bom_files = bom_files(&module, layers);
    launch = read_toml_opt(&launch_path)?;
  } else {
    let build: BuildToml = read_toml_opt(&output_dir.join(BUILD_FILE))?.unwrap_or_default();
    let build_bom = validator.validate(&module, plan, build.bom)?;
    result.met_requires = met_requirements(plan, &build.unmet)?;
    result.bom_files = bom_files(&module, layers);
    launch = read_toml_opt(&launch_path)?;

    let launch_bom = match &launch {
      Some(launch) => validator.validate(&module, plan, launch.bom.clone())?,
      None => Vec::new(),
    };
    result.bom = if build_bom.is_empty() { launch_bom } else { build_bom };
  }

  let Some(mut launch) = launch else {
    debug!(path = ?launch_path, "no launch configuration");
    return Ok(result);
  };

  if generation != Generation::Current {
    override_defaults(&mut launch.processes, logger);
  }
  validate_no_multiple_defaults(&launch.processes)?;

  for process in &mut launch.processes {
    process.module_id = descriptor.id.clone();
  }
  result.labels = launch.labels;
  result.processes = launch.processes;
  result.slices = launch.slices;

  Ok(result)
}
