//! Platform-specific child process termination.

use crate::error::{BridgeError, Result};
use std::process::Child;
use std::time::Duration;
#[cfg(unix)]
use std::time::Instant;
use tracing::{debug, warn};

/// Terminate `child` gracefully, then forcefully if needed, and reap it.
///
/// # Platform Behavior
/// - **Linux/macOS**: Sends SIGTERM, waits up to `grace`, then SIGKILL
/// - **Windows**: Kills the process immediately
pub fn terminate_child(child: &mut Child, grace: Duration) -> Result<()> {
    let pid = child.id();
    if let Ok(Some(status)) = child.try_wait() {
        debug!("Process {} already exited with {}", pid, status);
        return Ok(());
    }

    #[cfg(unix)]
    {
        if request_exit_unix(pid) && wait_for_exit(child, grace) {
            debug!("Process {} terminated gracefully", pid);
            return Ok(());
        }
        debug!("Process {} still running, killing", pid);
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill() {
        // InvalidInput means the process already exited.
        if e.kind() != std::io::ErrorKind::InvalidInput {
            return Err(BridgeError::Other(format!(
                "Failed to kill process {}: {}",
                pid, e
            )));
        }
    }
    child.wait()?;
    Ok(())
}

/// Send SIGTERM. Returns `false` if the signal could not be delivered.
#[cfg(unix)]
fn request_exit_unix(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    debug!("Sending SIGTERM to process {}", pid);
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => true,
        Err(e) => {
            warn!("Failed to send SIGTERM to {}: {}", pid, e);
            false
        }
    }
}

#[cfg(unix)]
fn wait_for_exit(child: &mut Child, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    let interval = Duration::from_millis(25);

    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(interval),
            Ok(None) => return false,
            Err(e) => {
                warn!("Failed to poll process {}: {}", child.id(), e);
                return false;
            }
        }
    }
}
