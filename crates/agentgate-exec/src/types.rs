use serde::{Deserialize, Serialize};

/// Where a command runs: a host and, for remote hosts, an optional login user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl ExecutionTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
        }
    }

    pub fn localhost() -> Self {
        Self::new("localhost")
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// `user@host`, or just `host` when no user is set.
    pub fn destination(&self) -> String {
        match self.user.as_deref() {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

/// Captured output of one command invocation.
///
/// A zero `exit_code` says nothing about `stderr`; both streams are kept
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Single text rendering used when a result is handed back to an agent:
    /// stdout, followed by stderr under a `[stderr]:` marker when present.
    pub fn combined_output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            output.push_str("\n[stderr]: ");
            output.push_str(&self.stderr);
        }
        output.trim().to_string()
    }
}

/// Whether an invocation runs on this machine or through the remote shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Local,
    Remote,
}

/// A fully resolved process invocation: program plus discrete arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub location: Location,
    pub program: String,
    pub args: Vec<String>,
}
