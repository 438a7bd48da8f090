//! Dotbridge - call into the .NET runtime from Rust through a PowerShell host.
//!
//! A PowerShell script hosts the .NET runtime and serves newline-delimited
//! JSON over a named pipe. This crate launches that host, speaks the protocol
//! and exposes remote types and objects as proxies: member access, method
//! calls, construction, event subscriptions and callbacks from the host back
//! into Rust.
//!
//! # Example
//!
//! ```rust,ignore
//! use dotbridge::{Arg, BridgeSession};
//!
//! fn main() -> dotbridge::Result<()> {
//!     let session = BridgeSession::builder()
//!         .script_path("./scripts/PsHost.ps1")
//!         .build()?;
//!
//!     let math = session.get_type("System.Math")?.into_object()?;
//!     let max = math.invoke("Max", vec![Arg::from(3), Arg::from(7)])?;
//!     println!("Max = {:?}", max.as_i64());
//!
//!     let list_type = session.namespace("System.Collections").child("Generic").get("List`1")?;
//!     println!("{:?}", list_type);
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ipc;
pub mod platform;
pub mod process;
pub mod proxy;
pub mod registry;

mod session;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use error::{BridgeError, Result};
pub use ipc::{Channel, HandleId, HostMessage, MemberKind};
pub use process::{HostLauncher, HostProcess};
pub use proxy::{
    Arg, BoundMethod, Callback, EventSubscription, Member, NamespaceProxy, ObjectProxy,
    PendingTask, Value,
};
pub use registry::{ListenerId, ResolvingEvent};
pub use session::{BridgeSession, FrameworkInfo, SessionBuilder, SessionState};
