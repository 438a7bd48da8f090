//! Client-side stand-ins for host values.
//!
//! Host responses decode into [`Value`]s; remote objects become
//! [`ObjectProxy`]s whose members are resolved on demand. Outgoing arguments
//! are built as [`Arg`]s.

mod marshal;
mod namespace;
mod object;
mod task;
mod value;

pub use marshal::{Arg, Callback};
pub use namespace::NamespaceProxy;
pub use object::{BoundMethod, EventSubscription, Member, ObjectProxy};
pub use task::PendingTask;
pub use value::Value;

pub(crate) use marshal::marshal;
pub(crate) use value::decode;
