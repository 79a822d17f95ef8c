mod build;
mod version;

pub use build::{BuildOptions, cmd_build};
pub use version::cmd_version;
