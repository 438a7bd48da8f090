//! Pipe IPC with the PowerShell host.
//!
//! Newline-delimited JSON over a .NET named pipe, one outstanding request at a
//! time, with host-initiated `event` messages nested inside a request.
//!
//! # Architecture
//!
//! - **Channel**: opens the pipe and frames lines over buffered halves
//! - **Transport**: request/reply loop, event dispatch, exit and dead-channel state
//! - **Protocol**: request/message types and value descriptors

pub mod channel;
pub mod protocol;
pub mod transport;

pub use channel::Channel;
pub use protocol::{
    EventReply, HandleId, HostMessage, MemberKind, MessageType, Request, ValueDescriptor,
};
pub use transport::{EventHandler, Transport};
