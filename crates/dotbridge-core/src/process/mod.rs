//! Host process supervision.
//!
//! The bridge runs a PowerShell script that hosts the .NET runtime and
//! listens on a named pipe. This module starts it, watches for its exit and
//! stops it when the session closes.

mod launcher;

pub use launcher::{default_script_path, generate_pipe_name, HostLauncher, HostProcess};
