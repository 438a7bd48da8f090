//! Error types for the dotbridge session.
//!
//! Transport and protocol failures mean the channel is corrupt and the session
//! has to be recreated. Host errors and misuse errors are ordinary, catchable
//! failures that leave the channel usable.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Channel errors
    #[error("Timeout connecting pipe: {pipe} (waited {timeout:?})")]
    ConnectTimeout { pipe: String, timeout: Duration },

    #[error("Pipe closed (Write failed)")]
    TransportWrite {
        #[source]
        source: std::io::Error,
    },

    #[error("Pipe closed ({message})")]
    TransportRead {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Pipe closed (Invalid JSON): {line}")]
    ProtocolDecode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Channel is no longer usable after a transport failure")]
    ChannelDead,

    // Remote errors
    #[error("Host Error: {message}")]
    Host { message: String },

    #[error("Host process has exited")]
    HostExited,

    // Local usage errors
    #[error("{message}")]
    Misuse { message: String },

    #[error("Bridge session is closed")]
    Closed,

    // Host process supervision
    #[error("Cannot find host script: {0}")]
    HostScriptNotFound(PathBuf),

    #[error("Host launch failed: {message}")]
    HostLaunch { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // Ambient conversions
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BridgeError {
    /// Create a misuse error with the given message.
    pub fn misuse(message: impl Into<String>) -> Self {
        BridgeError::Misuse {
            message: message.into(),
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error leaves the session unusable.
    ///
    /// Fatal errors are never retried: the caller has to build a new session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectTimeout { .. }
                | BridgeError::TransportWrite { .. }
                | BridgeError::TransportRead { .. }
                | BridgeError::ProtocolDecode { .. }
                | BridgeError::ChannelDead
                | BridgeError::HostExited
                | BridgeError::Closed
                | BridgeError::HostScriptNotFound(_)
                | BridgeError::HostLaunch { .. }
        )
    }

    /// Check if this error was reported by the remote host.
    pub fn is_host_error(&self) -> bool {
        matches!(self, BridgeError::Host { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::Host {
            message: "Type not found".into(),
        };
        assert_eq!(err.to_string(), "Host Error: Type not found");

        let err = BridgeError::TransportRead {
            message: "Read EOF".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "Pipe closed (Read EOF)");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(BridgeError::ChannelDead.is_fatal());
        assert!(BridgeError::ConnectTimeout {
            pipe: "PsNode_1_2".into(),
            timeout: Duration::from_secs(5),
        }
        .is_fatal());
        assert!(!BridgeError::Host {
            message: "boom".into()
        }
        .is_fatal());
        assert!(!BridgeError::misuse("Need 'new'?").is_fatal());
    }

    #[test]
    fn test_io_conversion_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: BridgeError = io.into();
        assert!(matches!(err, BridgeError::Io { source: Some(_), .. }));
    }
}
