//! Session-scoped registries.
//!
//! - [`HandleRegistry`]: live proxy leases and member-kind cache per handle
//! - [`CallbackRegistry`]: client callbacks addressable by the host
//! - [`ResolverRegistry`]: ordered assembly-resolving listeners

mod callbacks;
mod handles;
mod resolvers;

pub use callbacks::CallbackRegistry;
pub use handles::HandleRegistry;
pub use resolvers::{ListenerId, ResolverRegistry, ResolvingEvent};
