//! Per-handle bookkeeping: live proxy leases and cached member kinds.

use crate::ipc::{HandleId, MemberKind};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct HandleEntry {
    members: HashMap<String, MemberKind>,
    leases: usize,
    released: bool,
}

/// Tracks every handle the client currently holds a proxy for.
///
/// A handle is counted once per decode. The entry disappears when its last
/// lease is dropped.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: RefCell<HashMap<HandleId, HandleEntry>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new lease on `id` and return the live lease count.
    pub fn acquire(&self, id: &HandleId) -> usize {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(id.clone()).or_default();
        entry.leases += 1;
        entry.leases
    }

    /// Drop one lease on `id`.
    ///
    /// Returns `true` when this was the last lease and the handle still has to
    /// be released on the host.
    pub fn drop_lease(&self, id: &HandleId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(id) else {
            return false;
        };

        entry.leases = entry.leases.saturating_sub(1);
        if entry.leases > 0 {
            return false;
        }

        let needs_release = !entry.released;
        entries.remove(id);
        needs_release
    }

    /// Mark `id` as released explicitly so dropping its proxies sends nothing.
    ///
    /// Returns `false` if the handle was unknown or already released.
    pub fn mark_released(&self, id: &HandleId) -> bool {
        match self.entries.borrow_mut().get_mut(id) {
            Some(entry) if !entry.released => {
                entry.released = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_released(&self, id: &HandleId) -> bool {
        self.entries
            .borrow()
            .get(id)
            .is_some_and(|entry| entry.released)
    }

    pub fn member_kind(&self, id: &HandleId, member: &str) -> Option<MemberKind> {
        self.entries
            .borrow()
            .get(id)
            .and_then(|entry| entry.members.get(member).copied())
    }

    /// Cache the kind of `member`. Ignored for handles with no live proxy.
    pub fn set_member_kind(&self, id: &HandleId, member: &str, kind: MemberKind) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(id) {
            entry.members.insert(member.to_string(), kind);
        }
    }

    pub fn lease_count(&self, id: &HandleId) -> usize {
        self.entries.borrow().get(id).map_or(0, |entry| entry.leases)
    }

    /// Number of handles with at least one live proxy.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
