//! Client-side callbacks the host can invoke through `event` messages.

use crate::proxy::Callback;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Callbacks keyed by the id sent to the host.
///
/// Entries live until the session closes. The host never tells the client
/// when a callback becomes unreachable.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    entries: RefCell<HashMap<String, Callback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `callback` under a fresh `<prefix>_<uuid>` id and return the id.
    pub fn register(&self, prefix: &str, callback: Callback) -> String {
        let id = format!("{}_{}", prefix, Uuid::new_v4().simple());
        debug!("Registered callback {}", id);
        self.entries.borrow_mut().insert(id.clone(), callback);
        id
    }

    /// Look up a callback. The registry is not borrowed while it runs.
    pub fn get(&self, id: &str) -> Option<Callback> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every callback.
    ///
    /// Closures may own proxies, so they are dropped after the borrow ends.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        drop(drained);
    }
}
