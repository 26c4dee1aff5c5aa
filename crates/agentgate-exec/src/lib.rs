//! Command execution for agentgate.
//!
//! Decides whether a command runs on this machine or through the remote
//! shell, launches it, and normalises the outcome.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), agentgate_exec::ExecError> {
//! use agentgate_exec::{CommandDispatcher, ExecutionTarget};
//!
//! let dispatcher = CommandDispatcher::default();
//! let result = dispatcher
//!     .execute(&ExecutionTarget::localhost(), "echo hi")
//!     .await?;
//! assert_eq!(result.stdout, "hi\n");
//! # Ok(())
//! # }
//! ```
//!
//! A non-zero exit status is a successful dispatch; [`ExecError`] is returned
//! only when the process could not be launched, ran past its deadline, or the
//! remote target was refused.

pub mod address;
pub mod dispatcher;
pub mod error;
pub mod types;

pub use address::{is_local_host, is_loopback, is_loopback_ip, local_hostname};
pub use dispatcher::{CommandDispatcher, DEFAULT_TIMEOUT_SECS, DispatchConfig};
pub use error::ExecError;
pub use types::{ExecutionResult, ExecutionTarget, Invocation, Location};
