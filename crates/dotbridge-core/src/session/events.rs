//! Host-initiated events: callback invocations and assembly resolution.

use super::SessionInner;
use crate::config::ProtocolConfig;
use crate::ipc::{EventHandler, HostMessage, Request, ValueDescriptor};
use crate::proxy::{decode, marshal, Value};
use crate::registry::ResolvingEvent;
use anyhow::anyhow;
use serde_json::Value as Json;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Event handler injected into the session's transport.
///
/// Holds the session weakly: the transport is owned by the session itself.
pub(super) struct SessionEvents {
    session: Weak<SessionInner>,
}

impl SessionEvents {
    pub(super) fn new(session: Weak<SessionInner>) -> Self {
        Self { session }
    }
}

impl EventHandler for SessionEvents {
    fn handle_event(&self, event: &HostMessage) -> anyhow::Result<Json> {
        let session = self
            .session
            .upgrade()
            .ok_or_else(|| anyhow!("Bridge session was dropped"))?;
        session.handle_event(event)
    }
}

impl SessionInner {
    fn handle_event(self: &Rc<Self>, event: &HostMessage) -> anyhow::Result<Json> {
        if let Some(assembly_name) = event.assembly_name.as_deref() {
            return self.handle_resolving(event, assembly_name);
        }

        let Some(callback_id) = event.callback_id.as_deref() else {
            warn!("Event without callbackId, replying null");
            return Ok(Json::Null);
        };
        let Some(callback) = self.callbacks.get(callback_id) else {
            warn!("No callback registered for {}, replying null", callback_id);
            return Ok(Json::Null);
        };

        debug!("Dispatching event to {}", callback_id);
        let args: Vec<Value> = event
            .args
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|arg| decode(self, ValueDescriptor::from_json(arg)))
            .collect();

        let result = callback.call(args)?;
        let reply = marshal(self, &result, ProtocolConfig::ARG_CALLBACK_PREFIX);
        // Proxies in the result must outlive the reply; they are dropped once
        // the request that carried this event completes.
        self.reply_guards.borrow_mut().push(result);
        Ok(reply)
    }

    fn handle_resolving(self: &Rc<Self>, event: &HostMessage, assembly_name: &str) -> anyhow::Result<Json> {
        let resolving = ResolvingEvent {
            assembly_name: assembly_name.to_string(),
            assembly_version: event.assembly_version.clone(),
        };
        debug!(
            "Host is resolving {} {}",
            assembly_name,
            resolving.assembly_version.as_deref().unwrap_or("")
        );

        let Some(path) = self.resolvers.resolve(&resolving) else {
            return Ok(Json::Null);
        };
        self.request(Request::Resolved {
            resolved_path: path.clone(),
            callback_id: event.callback_id.clone(),
        })?;
        Ok(Json::String(path))
    }
}
