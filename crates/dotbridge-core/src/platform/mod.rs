//! Platform-specific helpers.
//!
//! Locating the PowerShell executable and terminating child processes differ
//! between Windows and Unix.

mod process;

pub use process::terminate_child;

use crate::config::HostConfig;
use std::path::PathBuf;

/// Path of the PowerShell executable used to run the host script.
///
/// # Platform Behavior
/// - **Windows**: `%windir%\System32\WindowsPowerShell\v1.0\powershell.exe`,
///   or `powershell.exe` from `PATH` if that is missing
/// - **Linux/macOS**: `pwsh`, resolved through `PATH`
pub fn powershell_path() -> PathBuf {
    #[cfg(windows)]
    {
        let windir =
            std::env::var("windir").unwrap_or_else(|_| HostConfig::DEFAULT_WINDIR.to_string());
        let path = windows_powershell_path(&windir);
        if path.exists() {
            path
        } else {
            PathBuf::from("powershell.exe")
        }
    }

    #[cfg(not(windows))]
    {
        PathBuf::from(HostConfig::UNIX_POWERSHELL)
    }
}

/// Windows PowerShell location under a given Windows directory.
pub fn windows_powershell_path(windir: &str) -> PathBuf {
    PathBuf::from(windir)
        .join("System32")
        .join("WindowsPowerShell")
        .join("v1.0")
        .join("powershell.exe")
}
