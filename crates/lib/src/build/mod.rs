//! Running a single module build.
//!
//! A build runs the module's executable against a private copy of its plan,
//! then reads back what the module left in its output directory:
//!
//! ```text
//! prepare paths -> run bin/build -> process layers -> update env -> read outputs
//! ```
//!
//! # Submodules
//!
//! - [`paths`] - Temporary plan file and output directory
//! - [`exec`] - Build executable invocation
//! - [`layers`] - Layer metadata discovery and build env contributions
//! - [`outputs`] - `launch.toml` / `build.toml` reconciliation
//! - [`execute`] - The end-to-end build sequence

pub mod exec;
pub mod execute;
pub mod layers;
pub mod outputs;
pub mod paths;
mod types;

pub use execute::run_build;
pub use types::*;
