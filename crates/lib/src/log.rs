//! Logging collaborator.
//!
//! Build steps never reach for a process-wide logger. The orchestrator owns a
//! [`Logger`] and passes it into every operation that reports progress or
//! advisories.

use tracing::{debug, info, warn};

pub trait Logger: Send + Sync {
  fn debug(&self, msg: &str);
  fn info(&self, msg: &str);
  fn warn(&self, msg: &str);
}

/// Forwards messages to `tracing`, tagged with the module being built.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
  module: Option<String>,
}

impl TracingLogger {
  pub fn for_module(module: impl Into<String>) -> Self {
    Self {
      module: Some(module.into()),
    }
  }

  fn module(&self) -> &str {
    self.module.as_deref().unwrap_or("-")
  }
}

impl Logger for TracingLogger {
  fn debug(&self, msg: &str) {
    debug!(module = %self.module(), "{msg}");
  }

  fn info(&self, msg: &str) {
    info!(module = %self.module(), "{msg}");
  }

  fn warn(&self, msg: &str) {
    warn!(module = %self.module(), "{msg}");
  }
}
