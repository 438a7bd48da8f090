//! PowerShell host launching.

use crate::config::HostConfig;
use crate::error::{BridgeError, Result};
use crate::platform;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

/// Generate a pipe name unique to this process: `PsNode_<pid>_<n>`.
pub fn generate_pipe_name() -> String {
    let suffix = rand::rng().random_range(0..HostConfig::PIPE_SUFFIX_RANGE);
    format!(
        "{}_{}_{}",
        HostConfig::PIPE_NAME_PREFIX,
        std::process::id(),
        suffix
    )
}

/// Host script location next to the running executable.
///
/// Falls back to a path relative to the working directory if the executable
/// path cannot be determined.
pub fn default_script_path() -> PathBuf {
    let relative = Path::new(HostConfig::SCRIPTS_DIR_NAME).join(HostConfig::SCRIPT_FILE_NAME);
    match std::env::current_exe() {
        Ok(exe) => match exe.parent() {
            Some(dir) => dir.join(relative),
            None => relative,
        },
        Err(e) => {
            debug!("Cannot determine executable path: {}", e);
            relative
        }
    }
}

/// How to start the PowerShell host.
#[derive(Debug, Clone)]
pub struct HostLauncher {
    /// PowerShell executable.
    pub powershell_path: PathBuf,
    /// Host script, run with `-PipeName <name>`.
    pub script_path: PathBuf,
    /// Working directory of the host process.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the host process.
    pub env_vars: HashMap<String, String>,
}

impl HostLauncher {
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        Self {
            powershell_path: platform::powershell_path(),
            script_path: script_path.into(),
            working_dir: None,
            env_vars: HashMap::new(),
        }
    }

    pub fn with_powershell(mut self, path: impl Into<PathBuf>) -> Self {
        self.powershell_path = path.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Build the host command line for `pipe_name`.
    ///
    /// The host shares the parent's stdio so its diagnostics stay visible.
    pub fn command(&self, pipe_name: &str) -> Command {
        let invocation = format!(
            "& '{}' -PipeName '{}'",
            self.script_path.display(),
            pipe_name
        );
        let mut cmd = Command::new(&self.powershell_path);
        cmd.args([
            "-NoProfile",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            invocation.as_str(),
        ]);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env_vars);
        cmd
    }

    /// Start the host listening on `pipe_name`.
    pub fn launch(&self, pipe_name: &str) -> Result<HostProcess> {
        if !self.script_path.exists() {
            return Err(BridgeError::HostScriptNotFound(self.script_path.clone()));
        }

        info!(
            "Launching host {} on pipe {}",
            self.script_path.display(),
            pipe_name
        );
        let child = self.command(pipe_name).spawn().map_err(|e| BridgeError::HostLaunch {
            message: format!("{}: {}", self.powershell_path.display(), e),
        })?;
        debug!("Host started with PID {}", child.id());

        Ok(HostProcess {
            child,
            pipe_name: pipe_name.to_string(),
        })
    }
}

/// A running host process.
#[derive(Debug)]
pub struct HostProcess {
    child: Child,
    pipe_name: String,
}

impl HostProcess {
    #[cfg(test)]
    pub(crate) fn from_child(child: Child, pipe_name: impl Into<String>) -> Self {
        Self {
            child,
            pipe_name: pipe_name.into(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }

    /// Whether the process has terminated. Reaps it if so.
    pub fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                info!("Host process {} exited with {}", self.child.id(), status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to poll host process {}: {}", self.child.id(), e);
                false
            }
        }
    }

    /// Stop the host and wait for it to exit.
    pub fn terminate(mut self) -> Result<()> {
        debug!("Terminating host process {}", self.child.id());
        platform::terminate_child(&mut self.child, HostConfig::TERMINATE_GRACE_PERIOD)
    }
}
