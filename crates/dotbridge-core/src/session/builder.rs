//! Builder for configuring a [`BridgeSession`].

use super::BridgeSession;
use crate::config::TransportConfig;
use crate::error::{BridgeError, Result};
use crate::process::{default_script_path, generate_pipe_name, HostLauncher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Builder for configuring a [`BridgeSession`].
///
/// Nothing is started by [`build`](Self::build): the host is launched and the
/// pipe connected on the first request.
///
/// # Example
///
/// ```rust,ignore
/// use dotbridge::BridgeSession;
///
/// let session = BridgeSession::builder()
///     .script_path("./scripts/PsHost.ps1")
///     .connect_timeout(Duration::from_secs(10))
///     .build()?;
/// let math = session.get_type("System.Math")?;
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    script_path: Option<PathBuf>,
    powershell_path: Option<PathBuf>,
    pipe_name: Option<String>,
    connect_timeout: Duration,
    working_dir: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    spawn_host: bool,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            script_path: None,
            powershell_path: None,
            pipe_name: None,
            connect_timeout: TransportConfig::CONNECT_TIMEOUT,
            working_dir: None,
            env_vars: HashMap::new(),
            spawn_host: true,
        }
    }

    /// Host script to run.
    ///
    /// Default: `scripts/PsHost.ps1` next to the running executable
    pub fn script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// PowerShell executable.
    ///
    /// Default: Windows PowerShell on Windows, `pwsh` elsewhere
    pub fn powershell_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.powershell_path = Some(path.into());
        self
    }

    /// Pipe name to use instead of a generated `PsNode_<pid>_<n>`.
    pub fn pipe_name(mut self, name: impl Into<String>) -> Self {
        self.pipe_name = Some(name.into());
        self
    }

    /// How long to keep retrying the pipe connection.
    ///
    /// Default: 5 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Extra environment variable for the host process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Whether to launch the host process.
    ///
    /// When disabled the session attaches to a host that is already listening
    /// on [`pipe_name`](Self::pipe_name), which is then required.
    ///
    /// Default: `true`
    pub fn spawn_host(mut self, enable: bool) -> Self {
        self.spawn_host = enable;
        self
    }

    pub fn build(self) -> Result<BridgeSession> {
        if self.connect_timeout.is_zero() {
            return Err(BridgeError::Config {
                message: "connect_timeout must be greater than zero".into(),
            });
        }

        let launcher = if self.spawn_host {
            let mut launcher =
                HostLauncher::new(self.script_path.unwrap_or_else(default_script_path));
            if let Some(path) = self.powershell_path {
                launcher = launcher.with_powershell(path);
            }
            if let Some(dir) = self.working_dir {
                launcher = launcher.with_working_dir(dir);
            }
            launcher.env_vars.extend(self.env_vars);
            Some(launcher)
        } else {
            if self.pipe_name.is_none() {
                return Err(BridgeError::Config {
                    message: "pipe_name is required when spawn_host is disabled".into(),
                });
            }
            if self.script_path.is_some() || self.powershell_path.is_some() {
                warn!("Host launch options are ignored when spawn_host is disabled");
            }
            None
        };

        let pipe_name = self.pipe_name.unwrap_or_else(generate_pipe_name);
        Ok(BridgeSession::with_launcher(
            launcher,
            pipe_name,
            self.connect_timeout,
        ))
    }
}
