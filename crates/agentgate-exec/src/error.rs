//! Dispatch error types.

use std::time::Duration;

/// Failures of the dispatch mechanism itself.
///
/// A command that runs and exits non-zero is not an error; it is reported
/// through [`crate::ExecutionResult::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("invalid execution target: {reason}")]
    InvalidTarget { reason: String },

    #[error("failed to collect command output: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    pub(crate) fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }
}
