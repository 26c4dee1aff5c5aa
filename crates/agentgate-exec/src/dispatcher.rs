//! Local/remote command dispatch.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::address::is_local_host;
use crate::error::ExecError;
use crate::types::{ExecutionResult, ExecutionTarget, Invocation, Location};

/// Default deadline for one command in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Grace period between SIGTERM and SIGKILL on timeout.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// How commands are launched.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Shell used for local commands, invoked as `shell -c <command>`.
    pub shell: String,
    /// Remote-shell executable (normally `ssh`).
    pub remote_shell: String,
    /// Extra arguments placed before the destination.
    pub remote_shell_args: Vec<String>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            remote_shell: "ssh".to_string(),
            remote_shell_args: vec!["-o".to_string(), "BatchMode=yes".to_string()],
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Runs operator commands on this machine or on a remote host.
///
/// Holds no mutable state; concurrent calls never contend on a lock.
#[derive(Debug, Clone, Default)]
pub struct CommandDispatcher {
    config: DispatchConfig,
}

impl CommandDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Resolve the process invocation for `command` on `target` without
    /// running it.
    pub fn plan(&self, target: &ExecutionTarget, command: &str) -> Result<Invocation, ExecError> {
        if is_local_host(&target.host) {
            return Ok(Invocation {
                location: Location::Local,
                program: self.config.shell.clone(),
                args: vec!["-c".to_string(), command.to_string()],
            });
        }

        validate_remote_target(target)?;

        let mut args = self.config.remote_shell_args.clone();
        args.push("--".to_string());
        args.push(target.destination());
        args.push(command.to_string());

        Ok(Invocation {
            location: Location::Remote,
            program: self.config.remote_shell.clone(),
            args,
        })
    }

    /// Run `command` on `target` and capture stdout, stderr and exit status.
    ///
    /// Only a failure of the launch mechanism (or the deadline) is an error.
    pub async fn execute(
        &self,
        target: &ExecutionTarget,
        command: &str,
    ) -> Result<ExecutionResult, ExecError> {
        let invocation = self.plan(target, command)?;
        info!(
            destination = %target.destination(),
            location = ?invocation.location,
            "Dispatching command"
        );
        debug!(command, "Command text");

        let result = self.run(&invocation).await?;
        debug!(exit_code = result.exit_code, "Command finished");
        Ok(result)
    }

    async fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| ExecError::Launch {
            program: invocation.program.clone(),
            source,
        })?;
        #[cfg(unix)]
        let process_group_id = child.id().map(|pid| pid as i32);

        let output = match self.config.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        program = %invocation.program,
                        timeout_secs = limit.as_secs_f64(),
                        "Command exceeded deadline; terminating"
                    );
                    #[cfg(unix)]
                    if let Some(process_group_id) = process_group_id {
                        let pgid = Pid::from_raw(process_group_id);
                        let _ = killpg(pgid, Signal::SIGTERM);
                        sleep(KILL_GRACE).await;
                        let _ = killpg(pgid, Signal::SIGKILL);
                    }
                    return Err(ExecError::Timeout { after: limit });
                }
            },
            None => child.wait_with_output().await?,
        };

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Host and user travel as one argv element to the remote shell, never
/// through a local shell. Values that the remote-shell tool would read as an
/// option or split into several words are refused.
fn validate_remote_target(target: &ExecutionTarget) -> Result<(), ExecError> {
    validate_component("host", &target.host)?;
    if target.host.contains('@') {
        return Err(ExecError::invalid_target("host must not contain '@'"));
    }
    if let Some(user) = target.user.as_deref() {
        validate_component("user", user)?;
        if user.contains('@') {
            return Err(ExecError::invalid_target("user must not contain '@'"));
        }
    }
    Ok(())
}

fn validate_component(field: &str, value: &str) -> Result<(), ExecError> {
    if value.is_empty() {
        return Err(ExecError::invalid_target(format!("{field} is empty")));
    }
    if value.starts_with('-') {
        return Err(ExecError::invalid_target(format!(
            "{field} must not start with '-'"
        )));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ExecError::invalid_target(format!(
            "{field} must not contain whitespace or control characters"
        )));
    }
    Ok(())
}
