//! Build executable invocation.
//!
//! Runs `<module-root>/bin/build <output> <platform> <plan>` from the
//! application directory and streams its stdout/stderr into caller-supplied
//! sinks while it runs.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::module::ModuleDescriptor;

use super::ExecuteConfig;

/// Variable naming the module's root directory, always set for the build.
pub const MODULE_DIR_VAR: &str = "CNB_BUILDPACK_DIR";

/// Destination for the build executable's output.
pub type Sink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Environment handed to the build executable.
pub fn build_command_env(
  descriptor: &ModuleDescriptor,
  config: &ExecuteConfig,
  env: &dyn BuildEnv,
) -> Result<Vec<(String, String)>, BuildError> {
  let mut vars = if descriptor.clear_env {
    env.list()
  } else {
    env.with_platform(&config.platform_dir)?
  };
  vars.push((MODULE_DIR_VAR.to_string(), descriptor.dir.to_string_lossy().into_owned()));
  Ok(vars)
}

/// Run the module's build executable to completion.
///
/// A non-zero exit is reported as [`BuildError::ModuleFailed`].
pub async fn run_build_cmd(
  descriptor: &ModuleDescriptor,
  output_dir: &Path,
  plan_path: &Path,
  config: &ExecuteConfig,
  env: &dyn BuildEnv,
  stdout: Sink<'_>,
  stderr: Sink<'_>,
) -> Result<(), BuildError> {
  let program = descriptor.dir.join("bin").join("build");
  let vars = build_command_env(descriptor, config, env)?;

  debug!(program = ?program, cwd = ?config.app_dir, clear_env = descriptor.clear_env, "spawning build");

  let mut child = Command::new(&program)
    .arg(output_dir)
    .arg(&config.platform_dir)
    .arg(plan_path)
    .current_dir(&config.app_dir)
    .env_clear()
    .envs(vars)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|e| BuildError::io("execute", &program, e))?;

  let child_stdout = child.stdout.take();
  let child_stderr = child.stderr.take();
  let (copied_stdout, copied_stderr, status) =
    tokio::join!(pipe(child_stdout, stdout), pipe(child_stderr, stderr), child.wait());

  copied_stdout.map_err(|e| BuildError::io("stream stdout of", &program, e))?;
  copied_stderr.map_err(|e| BuildError::io("stream stderr of", &program, e))?;
  let status = status.map_err(|e| BuildError::io("wait for", &program, e))?;

  if !status.success() {
    return Err(BuildError::ModuleFailed {
      module: descriptor.id.clone(),
      status,
    });
  }
  Ok(())
}

async fn pipe<R: AsyncRead + Unpin>(source: Option<R>, sink: Sink<'_>) -> io::Result<()> {
  if let Some(mut source) = source {
    tokio::io::copy(&mut source, &mut *sink).await?;
  }
  sink.flush().await
}
