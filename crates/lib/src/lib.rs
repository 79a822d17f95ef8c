//! layerbuild-lib: build-execution core for container image builds
//!
//! This crate runs one build module and reconciles what it produced:
//! - `ModuleDescriptor`: the module's identity and declared API version
//! - `Plan`: the requirements the module was asked to satisfy
//! - `LayerMetadata`: per-layer flags and metadata, in either schema
//! - `BuildResult`: BOM, met requirements, processes, labels and slices

pub mod api;
pub mod bom;
pub mod build;
pub mod env;
pub mod error;
pub mod launch;
pub mod layer;
pub mod log;
pub mod module;
pub mod plan;
pub mod util;

pub use api::ApiVersion;
pub use build::{BuildResult, ExecuteConfig, run_build};
pub use env::{BuildEnv, Env};
pub use error::{BuildError, ErrorKind};
pub use log::{Logger, TracingLogger};
pub use module::ModuleDescriptor;
pub use plan::Plan;
