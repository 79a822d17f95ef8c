//! Shared utilities.
//!
//! TOML file helpers used by every build step, plus test helpers.

pub mod files;

#[cfg(test)]
pub mod testutil;
