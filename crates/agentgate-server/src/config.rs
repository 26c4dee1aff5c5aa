use agentgate_exec::{DEFAULT_TIMEOUT_SECS, DispatchConfig};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 24 * 60 * 60;
const DEFAULT_SESSION_MAX_ENTRIES: usize = 10_000;

/// Process-wide configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth: AuthSecrets,
    pub exec: DispatchConfig,
    pub session_max_age: Duration,
    pub session_max_entries: usize,
}

/// Secret material the gates compare against.
///
/// Blank values are stored as absent, so an empty API key never matches and
/// an empty login or password disables basic auth.
#[derive(Clone, Default)]
pub struct AuthSecrets {
    api_key: Option<String>,
    login: Option<String>,
    password: Option<String>,
}

impl AuthSecrets {
    pub fn new(api_key: Option<String>, login: Option<String>, password: Option<String>) -> Self {
        Self {
            api_key: non_blank(api_key),
            login: non_blank(login),
            password: non_blank(password),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The login/password pair, only when both are configured.
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (self.login.as_deref(), self.password.as_deref()) {
            (Some(login), Some(password)) => Some((login, password)),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() { "<redacted>" } else { "<unset>" }
        }
        f.debug_struct("AuthSecrets")
            .field("api_key", &redact(&self.api_key))
            .field("login", &redact(&self.login))
            .field("password", &redact(&self.password))
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    auth: AuthSection,
    #[serde(default)]
    exec: ExecSection,
    #[serde(default)]
    session: SessionSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AuthSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecSection {
    #[serde(default = "default_shell")]
    shell: String,
    #[serde(default = "default_remote_shell")]
    remote_shell: String,
    #[serde(default = "default_remote_shell_args")]
    remote_shell_args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl Default for ExecSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            remote_shell: default_remote_shell(),
            remote_shell_args: default_remote_shell_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionSection {
    #[serde(default = "default_session_max_age_secs")]
    max_age_secs: u64,
    #[serde(default = "default_session_max_entries")]
    max_entries: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_age_secs: default_session_max_age_secs(),
            max_entries: default_session_max_entries(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_shell() -> String {
    DispatchConfig::default().shell
}

fn default_remote_shell() -> String {
    DispatchConfig::default().remote_shell
}

fn default_remote_shell_args() -> Vec<String> {
    DispatchConfig::default().remote_shell_args
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_session_max_age_secs() -> u64 {
    DEFAULT_SESSION_MAX_AGE_SECS
}

fn default_session_max_entries() -> usize {
    DEFAULT_SESSION_MAX_ENTRIES
}

/// `0` disables the deadline.
fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl From<FileConfig> for ServerConfig {
    fn from(file: FileConfig) -> Self {
        Self {
            host: file.server.host,
            port: file.server.port,
            auth: AuthSecrets::new(file.auth.api_key, file.auth.login, file.auth.password),
            exec: DispatchConfig {
                shell: file.exec.shell,
                remote_shell: file.exec.remote_shell,
                remote_shell_args: file.exec.remote_shell_args,
                timeout: timeout_from_secs(file.exec.timeout_secs),
            },
            session_max_age: Duration::from_secs(file.session.max_age_secs),
            session_max_entries: file.session.max_entries,
        }
    }
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(file_config.into());
        }

        Ok(Self::from_env())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("AGENTGATE_HOST").unwrap_or_else(default_host);
        let port = lookup("AGENTGATE_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let timeout_secs = lookup("AGENTGATE_EXEC_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or_else(default_timeout_secs);
        let session_max_age_secs = lookup("AGENTGATE_SESSION_MAX_AGE_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or_else(default_session_max_age_secs);
        let session_max_entries = lookup("AGENTGATE_SESSION_MAX_ENTRIES")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or_else(default_session_max_entries);

        Self {
            host,
            port,
            auth: AuthSecrets::new(
                lookup("AGENTGATE_API_KEY"),
                lookup("AGENTGATE_AUTH_LOGIN"),
                lookup("AGENTGATE_AUTH_PASSWORD"),
            ),
            exec: DispatchConfig {
                shell: lookup("AGENTGATE_SHELL").unwrap_or_else(default_shell),
                remote_shell: lookup("AGENTGATE_REMOTE_SHELL")
                    .unwrap_or_else(default_remote_shell),
                remote_shell_args: default_remote_shell_args(),
                timeout: timeout_from_secs(timeout_secs),
            },
            session_max_age: Duration::from_secs(session_max_age_secs),
            session_max_entries,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("AGENTGATE_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("agentgate.toml").exists() {
        Some("agentgate.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    parse_file(Path::new(&path)).map(Some)
}

fn parse_file(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn from_vars(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_env_defaults() {
        let config = from_vars(&[]);
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert_eq!(config.auth.api_key(), None);
        assert_eq!(config.auth.basic_credentials(), None);
        assert_eq!(config.exec.shell, "sh");
        assert_eq!(config.exec.remote_shell, "ssh");
        assert_eq!(config.exec.timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.session_max_age, Duration::from_secs(86_400));
        assert_eq!(config.session_max_entries, 10_000);
    }

    #[test]
    fn test_env_overrides() {
        let config = from_vars(&[
            ("AGENTGATE_HOST", "0.0.0.0"),
            ("AGENTGATE_PORT", "8088"),
            ("AGENTGATE_API_KEY", "k-123"),
            ("AGENTGATE_AUTH_LOGIN", "admin"),
            ("AGENTGATE_AUTH_PASSWORD", "hunter2"),
            ("AGENTGATE_EXEC_TIMEOUT_SECS", "0"),
            ("AGENTGATE_REMOTE_SHELL", "/usr/bin/ssh"),
            ("AGENTGATE_SESSION_MAX_ENTRIES", "64"),
        ]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8088");
        assert_eq!(config.auth.api_key(), Some("k-123"));
        assert_eq!(config.auth.basic_credentials(), Some(("admin", "hunter2")));
        assert_eq!(config.exec.timeout, None);
        assert_eq!(config.exec.remote_shell, "/usr/bin/ssh");
        assert_eq!(config.session_max_entries, 64);
    }

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let config = from_vars(&[("AGENTGATE_PORT", "not-a-port")]);
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_blank_secrets_are_absent() {
        let config = from_vars(&[
            ("AGENTGATE_API_KEY", "   "),
            ("AGENTGATE_AUTH_LOGIN", "admin"),
            ("AGENTGATE_AUTH_PASSWORD", ""),
        ]);
        assert_eq!(config.auth.api_key(), None);
        assert_eq!(config.auth.basic_credentials(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let secrets = AuthSecrets::new(
            Some("top-secret-key".to_string()),
            Some("admin".to_string()),
            None,
        );
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("top-secret-key"));
        assert!(!rendered.contains("admin"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("<unset>"));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 7000

[auth]
api_key = "file-key"

[exec]
remote_shell_args = ["-p", "2222"]
timeout_secs = 30

[session]
max_age_secs = 600
max_entries = 500
"#
        )
        .unwrap();

        let config: ServerConfig = parse_file(file.path()).unwrap().into();
        assert_eq!(config.bind_addr(), "127.0.0.1:7000");
        assert_eq!(config.auth.api_key(), Some("file-key"));
        assert_eq!(config.exec.remote_shell_args, vec!["-p", "2222"]);
        assert_eq!(config.exec.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.session_max_age, Duration::from_secs(600));
        assert_eq!(config.session_max_entries, 500);
    }

    #[test]
    fn test_parse_file_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = parse_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
