//! Assembly-resolving listeners.
//!
//! When the host cannot locate a dependency it raises a resolving event.
//! Listeners run in registration order and the first one that returns a path
//! wins.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error};

/// Details of an assembly the host failed to locate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvingEvent {
    pub assembly_name: String,
    pub assembly_version: Option<String>,
}

/// Handle returned by `add`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type ListenerFn = dyn Fn(&ResolvingEvent) -> anyhow::Result<Option<String>>;

#[derive(Default)]
pub struct ResolverRegistry {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Rc<ListenerFn>)>>,
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ResolvingEvent) -> anyhow::Result<Option<String>> + 'static,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Ask each listener in turn for a path to `event.assembly_name`.
    ///
    /// Failing listeners are logged and skipped. Listeners may add or remove
    /// listeners while running; changes apply to the next event.
    pub fn resolve(&self, event: &ResolvingEvent) -> Option<String> {
        let snapshot: Vec<Rc<ListenerFn>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            match listener(event) {
                Ok(Some(path)) => {
                    debug!("Resolved {} to {}", event.assembly_name, path);
                    return Some(path);
                }
                Ok(None) => {}
                Err(e) => error!("Resolving listener failed for {}: {:#}", event.assembly_name, e),
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(drained);
    }
}
