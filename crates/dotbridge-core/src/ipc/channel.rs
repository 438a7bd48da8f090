//! Duplex byte channel to the host process.
//!
//! The host listens on a .NET named pipe. On Windows that is
//! `\\.\pipe\<name>`; on Unix .NET emulates named pipes with a domain socket
//! at `<temp>/CoreFxPipe_<name>`.

use super::protocol::{read_line, write_line};
use crate::config::TransportConfig;
use crate::{BridgeError, Result};
use serde::Serialize;
use std::fmt;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Buffered line channel over a read half and a write half.
pub struct Channel {
    reader: BufReader<Box<dyn Read>>,
    writer: Box<dyn Write>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("buffered", &self.reader.buffer().len())
            .finish()
    }
}

impl Channel {
    /// Build a channel from already-open halves.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + 'static,
        W: Write + 'static,
    {
        Self {
            reader: BufReader::with_capacity(
                TransportConfig::READ_BUFFER_CAPACITY,
                Box::new(reader) as Box<dyn Read>,
            ),
            writer: Box::new(writer),
        }
    }

    /// Platform path of the named pipe `pipe_name`.
    pub fn pipe_path(pipe_name: &str) -> PathBuf {
        #[cfg(windows)]
        {
            PathBuf::from(format!(r"\\.\pipe\{}", pipe_name))
        }

        #[cfg(not(windows))]
        {
            std::env::temp_dir().join(format!(
                "{}{}",
                TransportConfig::UNIX_PIPE_PREFIX,
                pipe_name
            ))
        }
    }

    /// Open the named pipe, retrying until it is ready or `timeout` elapses.
    pub fn connect(pipe_name: &str, timeout: Duration) -> Result<Self> {
        let path = Self::pipe_path(pipe_name);
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match Self::open(&path) {
                Ok(channel) => {
                    info!(
                        "Connected to pipe {} after {} attempt(s)",
                        path.display(),
                        attempts
                    );
                    return Ok(channel);
                }
                Err(e) => {
                    if start.elapsed() > timeout {
                        return Err(BridgeError::ConnectTimeout {
                            pipe: path.display().to_string(),
                            timeout,
                        });
                    }
                    debug!("Pipe {} not ready yet: {}", path.display(), e);
                    std::thread::sleep(TransportConfig::CONNECT_RETRY_INTERVAL);
                }
            }
        }
    }

    #[cfg(unix)]
    fn open(path: &Path) -> std::io::Result<Self> {
        let stream = std::os::unix::net::UnixStream::connect(path)?;
        let writer = stream.try_clone()?;
        Ok(Self::new(stream, writer))
    }

    #[cfg(windows)]
    fn open(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;
        let writer = file.try_clone()?;
        Ok(Self::new(file, writer))
    }

    #[cfg(not(any(unix, windows)))]
    fn open(_path: &Path) -> std::io::Result<Self> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "named pipes are not supported on this platform",
        ))
    }

    /// Write one message line.
    pub fn send_line<T: Serialize>(&mut self, message: &T) -> Result<()> {
        write_line(&mut self.writer, message)
    }

    /// Read one line; `None` on EOF.
    pub fn recv_line(&mut self) -> Result<Option<String>> {
        read_line(&mut self.reader)
    }
}
