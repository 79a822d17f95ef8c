//! Implementation of the `layerbuild build` command.
//!
//! Runs one module's build executable against a plan and writes the
//! reconciled result as JSON for the export stage.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use tokio::io::AsyncWrite;
use tracing::info;

use layerbuild_lib::build::paths::escape_id;
use layerbuild_lib::util::files::read_toml;
use layerbuild_lib::{Env, ExecuteConfig, ModuleDescriptor, Plan, TracingLogger, run_build};

use crate::exit::{CODE_BUILD_FAILED, Failure};
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, print_warning, write_json};

pub struct BuildOptions {
  pub module_dir: PathBuf,
  pub layers: PathBuf,
  pub platform: PathBuf,
  pub app: PathBuf,
  pub plan: Option<PathBuf>,
  pub output: Option<PathBuf>,
  pub format: OutputFormat,
}

/// Execute the build command.
///
/// - Reads and checks the module descriptor
/// - Runs the module against the plan (an empty plan when none is given)
/// - Writes the result to `--output`, or `<layers>/<escaped-id>.result.json`
pub fn cmd_build(opts: BuildOptions) -> Result<(), Failure> {
  let start = Instant::now();

  let descriptor = ModuleDescriptor::read(&opts.module_dir).map_err(|e| Failure::build("read module descriptor", e))?;
  descriptor
    .ensure_supported()
    .map_err(|e| Failure::build("check module API", e))?;

  let plan: Plan = match &opts.plan {
    Some(path) => read_toml(path).map_err(|e| Failure::build("read plan", e))?,
    None => Plan::default(),
  };

  let config = ExecuteConfig {
    app_dir: opts.app,
    platform_dir: opts.platform,
    layers_dir: opts.layers,
  };
  let logger = TracingLogger::for_module(&descriptor.id);
  let mut env = Env::from_process();

  info!(module = %descriptor, requirements = plan.entries.len(), "starting build");

  let json = opts.format.is_json();
  let rt = tokio::runtime::Runtime::new()
    .context("Failed to create async runtime")
    .map_err(|e| Failure::new(CODE_BUILD_FAILED, "build", e))?;
  let result = rt
    .block_on(async {
      // With JSON on stdout the module's own output moves to stderr.
      let mut module_out: Box<dyn AsyncWrite + Unpin + Send> = if json {
        Box::new(tokio::io::stderr())
      } else {
        Box::new(tokio::io::stdout())
      };
      let mut module_err = tokio::io::stderr();
      run_build(&descriptor, plan, &config, &mut env, &logger, &mut *module_out, &mut module_err).await
    })
    .map_err(|e| Failure::build("build", e))?;

  let output = opts
    .output
    .unwrap_or_else(|| config.layers_dir.join(format!("{}.result.json", escape_id(&descriptor.id))));
  write_json(&output, &result).map_err(|e| Failure::new(CODE_BUILD_FAILED, "write build result", e))?;

  if json {
    print_json(&result).map_err(|e| Failure::new(CODE_BUILD_FAILED, "print build result", e))?;
    return Ok(());
  }

  eprintln!();
  print_success(&format!("Built {descriptor}"));
  if result.met_requires.is_empty() {
    print_warning("No requirements were met");
  } else {
    print_stat("Met", &result.met_requires.join(", "));
  }
  print_stat("BOM entries", &result.bom.len().to_string());
  print_stat("Processes", &result.processes.len().to_string());
  print_stat("Result", &output.display().to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
