//! End-to-end build of one module.

use tracing::info;

use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::log::Logger;
use crate::module::ModuleDescriptor;
use crate::plan::Plan;

use super::exec::{Sink, run_build_cmd};
use super::layers::{process_layers, setup_env};
use super::outputs::read_output_files;
use super::paths::prepare_build_paths;
use super::{BuildPhase, BuildResult, ExecuteConfig};

/// Run `descriptor`'s build executable for `plan` and reconcile its outputs.
///
/// Descriptors with an unsupported API are rejected before anything is
/// written. Build layers declared by the module are folded into `env` before
/// the result is assembled. The private plan directory is removed on return,
/// including on error.
pub async fn run_build(
  descriptor: &ModuleDescriptor,
  plan: Plan,
  config: &ExecuteConfig,
  env: &mut dyn BuildEnv,
  logger: &dyn Logger,
  stdout: Sink<'_>,
  stderr: Sink<'_>,
) -> Result<BuildResult, BuildError> {
  descriptor.ensure_supported()?;
  info!(module = %descriptor, api = %descriptor.api, "running build");
  logger.debug(&format!("Running build for module {descriptor}"));

  let mut module_plan = plan.clone();
  module_plan.normalize_for(descriptor.api);

  let paths = prepare_build_paths(&config.layers_dir, &descriptor.id, &module_plan)?;
  phase(logger, BuildPhase::Prepared);

  run_build_cmd(
    descriptor,
    &paths.output_dir,
    &paths.plan_path,
    config,
    &*env,
    stdout,
    stderr,
  )
  .await?;
  phase(logger, BuildPhase::Executed);

  let layers = process_layers(&paths.output_dir, descriptor, logger)?;
  phase(logger, BuildPhase::LayersProcessed);

  setup_env(&layers, descriptor.api, env)?;
  phase(logger, BuildPhase::EnvUpdated);

  let result = read_output_files(&paths.output_dir, &paths.plan_path, &plan, &layers, descriptor, logger)?;
  phase(logger, BuildPhase::Reconciled);

  Ok(result)
}

fn phase(logger: &dyn Logger, phase: BuildPhase) {
  logger.debug(&format!("Build {phase}"));
}
