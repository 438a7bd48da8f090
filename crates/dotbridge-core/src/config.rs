//! Centralized configuration for dotbridge.
//!
//! Constants for the pipe transport, the wire protocol naming conventions and
//! the PowerShell host launch.

use std::time::Duration;

/// Pipe transport configuration.
pub struct TransportConfig;

impl TransportConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);
    pub const READ_BUFFER_CAPACITY: usize = 64 * 1024;
    /// Prefix .NET uses for named pipes emulated as Unix domain sockets.
    pub const UNIX_PIPE_PREFIX: &'static str = "CoreFxPipe_";
}

/// Wire protocol naming conventions.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// Member names with this prefix subscribe to the named event.
    pub const EVENT_PREFIX: &'static str = "add_";
    /// Key of the handle token sent for object arguments.
    pub const REF_KEY: &'static str = "__ref";
    pub const CALLBACK_TOKEN_TYPE: &'static str = "callback";
    pub const SUBSCRIPTION_CALLBACK_PREFIX: &'static str = "cb";
    pub const ARG_CALLBACK_PREFIX: &'static str = "cb_arg";
    pub const CTOR_CALLBACK_PREFIX: &'static str = "cb_ctor";
}

/// PowerShell host launch configuration.
pub struct HostConfig;

impl HostConfig {
    pub const PIPE_NAME_PREFIX: &'static str = "PsNode";
    pub const PIPE_SUFFIX_RANGE: u32 = 10_000;
    pub const SCRIPT_FILE_NAME: &'static str = "PsHost.ps1";
    pub const SCRIPTS_DIR_NAME: &'static str = "scripts";
    pub const DEFAULT_WINDIR: &'static str = "C:\\Windows";
    pub const UNIX_POWERSHELL: &'static str = "pwsh";
    pub const TERMINATE_GRACE_PERIOD: Duration = Duration::from_millis(500);
}
