mod cmd;
mod exit;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{BuildOptions, cmd_build, cmd_version};
use crate::exit::{CODE_INVALID_ARGS, CODE_SUCCESS};
use crate::output::{OutputFormat, print_error};

/// layerbuild - run a build module and reconcile what it produced
#[derive(Parser)]
#[command(name = "layerbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one module's build executable and write its build result
  Build {
    /// Module root directory containing buildpack.toml and bin/build
    #[arg(long, env = "LAYERBUILD_MODULE_DIR")]
    module_dir: PathBuf,

    /// Root directory for module output directories
    #[arg(long, env = "LAYERBUILD_LAYERS_DIR")]
    layers: PathBuf,

    /// Platform directory passed to the module
    #[arg(long, env = "LAYERBUILD_PLATFORM_DIR")]
    platform: PathBuf,

    /// Application directory, used as the module's working directory
    #[arg(long, env = "LAYERBUILD_APP_DIR")]
    app: PathBuf,

    /// Plan file listing the module's requirements (default: empty plan)
    #[arg(long, env = "LAYERBUILD_PLAN")]
    plan: Option<PathBuf>,

    /// Where to write the build result (default: <layers>/<module-id>.result.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Show version and supported module APIs
  Version,
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      // --help and --version arrive here too and are not failures.
      let code = if e.use_stderr() { CODE_INVALID_ARGS } else { CODE_SUCCESS };
      let _ = e.print();
      return ExitCode::from(code);
    }
  };

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build {
      module_dir,
      layers,
      platform,
      app,
      plan,
      output,
      format,
    } => cmd_build(BuildOptions {
      module_dir,
      layers,
      platform,
      app,
      plan,
      output,
      format,
    }),
    Commands::Version => {
      cmd_version();
      Ok(())
    }
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(failure) => {
      print_error(&failure.to_string());
      ExitCode::from(failure.code)
    }
  }
}
