//! Process exit codes and the error type that carries them.

use std::fmt;

use layerbuild_lib::BuildError;

pub const CODE_SUCCESS: u8 = 0;
pub const CODE_INVALID_ARGS: u8 = 3;
pub const CODE_INCOMPATIBLE_MODULE_API: u8 = 12;
pub const CODE_MODULE_FAILED: u8 = 51;
pub const CODE_BUILD_FAILED: u8 = 52;

/// A command failure, reported as `failed to <action>: <cause>`.
#[derive(Debug)]
pub struct Failure {
  pub code: u8,
  pub action: &'static str,
  pub cause: anyhow::Error,
}

impl Failure {
  pub fn new(code: u8, action: &'static str, cause: impl Into<anyhow::Error>) -> Self {
    Self {
      code,
      action,
      cause: cause.into(),
    }
  }

  /// Classify `cause` by the build error it wraps, if any.
  pub fn build(action: &'static str, cause: impl Into<anyhow::Error>) -> Self {
    let cause = cause.into();
    Self {
      code: code_for(&cause),
      action,
      cause,
    }
  }
}

impl fmt::Display for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "failed to {}: {:#}", self.action, self.cause)
  }
}

pub fn code_for(err: &anyhow::Error) -> u8 {
  match err.downcast_ref::<BuildError>() {
    Some(BuildError::UnsupportedApi { .. }) => CODE_INCOMPATIBLE_MODULE_API,
    Some(e) if e.is_module_fault() => CODE_MODULE_FAILED,
    _ => CODE_BUILD_FAILED,
  }
}
