//! Bridge session: the root of every remote interaction.
//!
//! A [`BridgeSession`] owns the host process, the pipe transport and the
//! per-session registries. It is single-threaded (`!Send`); clones share the
//! same session.
//!
//! # Lifecycle
//!
//! `Idle` until the first request launches the host and connects. `Open`
//! while the host is serving. `Exited` once the host signals exit or its
//! process ends; every later operation fails with [`BridgeError::HostExited`].
//! `Closed` after [`BridgeSession::close`] or a failed start; every later
//! operation fails with [`BridgeError::Closed`].
//!
//! Callbacks that capture proxies keep the session alive. Call `close` to
//! break those cycles.

mod builder;
mod events;

pub use builder::SessionBuilder;

use crate::error::{BridgeError, Result};
use crate::ipc::{Channel, HandleId, HostMessage, Request, Transport, ValueDescriptor};
use crate::process::{HostLauncher, HostProcess};
use crate::proxy::{decode, Arg, NamespaceProxy, Value};
use crate::registry::{CallbackRegistry, HandleRegistry, ListenerId, ResolverRegistry, ResolvingEvent};
use events::SessionEvents;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open,
    Exited,
    Closed,
}

/// Target framework and runtime reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkInfo {
    pub framework_moniker: String,
    pub runtime_version: String,
}

pub(crate) struct SessionInner {
    transport: Transport,
    pub(crate) handles: HandleRegistry,
    pub(crate) callbacks: CallbackRegistry,
    pub(crate) resolvers: ResolverRegistry,
    launcher: Option<HostLauncher>,
    host: RefCell<Option<HostProcess>>,
    state: Cell<SessionState>,
    /// Callback results whose proxies must survive until their reply is consumed.
    reply_guards: RefCell<Vec<Arg>>,
}

impl SessionInner {
    fn new_rc(
        launcher: Option<HostLauncher>,
        state: SessionState,
        make_transport: impl FnOnce(Box<SessionEvents>) -> Transport,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            transport: make_transport(Box::new(SessionEvents::new(weak.clone()))),
            handles: HandleRegistry::new(),
            callbacks: CallbackRegistry::new(),
            resolvers: ResolverRegistry::new(),
            launcher,
            host: RefCell::new(None),
            state: Cell::new(state),
            reply_guards: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state.get()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state.get() {
            SessionState::Open => {
                if self.host_has_exited() {
                    self.mark_exited();
                    return Err(BridgeError::HostExited);
                }
                Ok(())
            }
            SessionState::Idle => self.start(),
            SessionState::Exited => Err(BridgeError::HostExited),
            SessionState::Closed => Err(BridgeError::Closed),
        }
    }

    /// Launch the host (if configured) and connect. Any failure closes the session.
    fn start(&self) -> Result<()> {
        if let Err(e) = self.try_start() {
            warn!("Failed to start bridge session: {}", e);
            self.state.set(SessionState::Closed);
            let host = self.host.borrow_mut().take();
            if let Some(host) = host {
                if let Err(e) = host.terminate() {
                    warn!("Failed to stop host after start failure: {}", e);
                }
            }
            return Err(e);
        }

        info!("Bridge session open on pipe {}", self.transport.pipe_name());
        self.state.set(SessionState::Open);
        Ok(())
    }

    fn try_start(&self) -> Result<()> {
        if let Some(launcher) = &self.launcher {
            let host = launcher.launch(self.transport.pipe_name())?;
            *self.host.borrow_mut() = Some(host);
        }
        self.transport.connect()
    }

    fn host_has_exited(&self) -> bool {
        self.host
            .borrow_mut()
            .as_mut()
            .is_some_and(HostProcess::has_exited)
    }

    fn mark_exited(&self) {
        if self.state.get() != SessionState::Exited {
            info!("Host exited, bridge session is no longer usable");
            self.state.set(SessionState::Exited);
        }
    }

    fn is_usable(&self) -> bool {
        self.state.get() == SessionState::Open && !self.transport.is_exited()
    }

    /// Send `request` and return its terminal response.
    ///
    /// An `exit` response ends the session and surfaces as `HostExited`.
    pub(crate) fn request(&self, request: Request) -> Result<HostMessage> {
        self.ensure_open()?;
        let outcome = self.transport.send(&request);
        self.drop_reply_guards();

        let message = outcome?;
        if message.is_exit() {
            self.mark_exited();
            return Err(BridgeError::HostExited);
        }
        Ok(message)
    }

    /// Send `request` and decode its response as a value.
    pub(crate) fn request_value(self: &Rc<Self>, request: Request) -> Result<Value> {
        let message = self.request(request)?;
        Ok(decode(self, ValueDescriptor::from_message(message)))
    }

    fn drop_reply_guards(&self) {
        let guards = std::mem::take(&mut *self.reply_guards.borrow_mut());
        drop(guards);
    }

    pub(crate) fn get_type(self: &Rc<Self>, name: &str) -> Result<Value> {
        self.request_value(Request::GetType {
            type_name: name.to_string(),
        })
    }

    /// Send `Release` for `id`, ignoring failures.
    pub(crate) fn release_quietly(&self, id: &HandleId) {
        if !self.is_usable() {
            debug!("Skipping release of {}: session not open", id);
            return;
        }
        if let Err(e) = self.request(Request::Release {
            target_id: id.clone(),
        }) {
            debug!("Release of {} failed: {}", id, e);
        }
    }

    /// Called when a proxy lease is dropped.
    pub(crate) fn drop_lease(&self, id: &HandleId) {
        if self.handles.drop_lease(id) {
            self.release_quietly(id);
        }
    }

    fn release(&self, id: &HandleId) {
        if self.handles.is_released(id) {
            debug!("Handle {} already released", id);
            return;
        }
        self.handles.mark_released(id);
        self.release_quietly(id);
    }

    fn close(&self) {
        if self.state.get() == SessionState::Closed {
            return;
        }
        self.state.set(SessionState::Closed);
        self.transport.disconnect();

        let host = self.host.borrow_mut().take();
        if let Some(host) = host {
            if let Err(e) = host.terminate() {
                warn!("Failed to stop host process: {}", e);
            }
        }

        self.drop_reply_guards();
        self.callbacks.clear();
        self.resolvers.clear();
        self.handles.clear();
        info!("Bridge session closed");
    }

    fn is_alive(&self) -> bool {
        match self.state.get() {
            SessionState::Idle => false,
            SessionState::Exited | SessionState::Closed => false,
            SessionState::Open => {
                if self.host_has_exited() {
                    self.mark_exited();
                    return false;
                }
                self.transport.is_connected() && !self.transport.is_exited()
            }
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(host) = self.host.get_mut().take() {
            debug!("Session dropped, stopping host process {}", host.pid());
            if let Err(e) = host.terminate() {
                warn!("Failed to stop host process: {}", e);
            }
        }
    }
}

/// Handle to a bridge session.
#[derive(Clone)]
pub struct BridgeSession {
    inner: Rc<SessionInner>,
}

impl fmt::Debug for BridgeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSession")
            .field("pipe_name", &self.pipe_name())
            .field("state", &self.state())
            .field("live_handles", &self.live_handles())
            .finish()
    }
}

impl BridgeSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Session with default settings: launches the host from the default
    /// script location on first use.
    pub fn new() -> Result<Self> {
        SessionBuilder::new().build()
    }

    pub(crate) fn with_launcher(
        launcher: Option<HostLauncher>,
        pipe_name: String,
        connect_timeout: Duration,
    ) -> Self {
        let inner = SessionInner::new_rc(launcher, SessionState::Idle, |handler| {
            Transport::new(pipe_name, connect_timeout, handler)
        });
        Self { inner }
    }

    /// Session over an already-connected channel. No host process is managed.
    pub fn from_channel(channel: Channel) -> Self {
        let inner = SessionInner::new_rc(None, SessionState::Open, |handler| {
            Transport::with_channel(channel, handler)
        });
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<SessionInner> {
        &self.inner
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn pipe_name(&self) -> &str {
        self.inner.transport.pipe_name()
    }

    /// Start the host and connect now instead of on the first request.
    pub fn connect(&self) -> Result<()> {
        self.inner.ensure_open()
    }

    /// Resolve a fully qualified name to a type, namespace or value.
    pub fn get_type(&self, name: &str) -> Result<Value> {
        self.inner.get_type(name)
    }

    /// Same lookup as [`get_type`](Self::get_type), for assembly-qualified names.
    pub fn get_assembly(&self, name: &str) -> Result<Value> {
        self.inner.get_type(name)
    }

    /// Start a dotted-name lookup at `prefix`. Sends nothing.
    pub fn namespace(&self, prefix: &str) -> NamespaceProxy {
        NamespaceProxy::new(self.inner.clone(), prefix)
    }

    /// Load an assembly from `path` into the host.
    pub fn load_assembly(&self, path: &str) -> Result<()> {
        self.inner.request(Request::LoadAssembly {
            assembly_path: path.to_string(),
        })?;
        Ok(())
    }

    /// Load an assembly and return what the host exposes for it.
    pub fn require(&self, path: &str) -> Result<Value> {
        self.inner.request_value(Request::RequireModule {
            assembly_path: path.to_string(),
        })
    }

    /// Release `handle` on the host now.
    ///
    /// Best effort: failures are logged, never returned. Proxies of the handle
    /// stay usable locally but will not release it again when dropped.
    pub fn release(&self, handle: &HandleId) {
        self.inner.release(handle);
    }

    /// Stop the host, drop the channel and clear all registries. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Both framework fields. Fails if the host omits either.
    pub fn framework_info(&self) -> Result<FrameworkInfo> {
        let message = self.inner.request(Request::GetFrameworkInfo)?;
        Ok(FrameworkInfo {
            framework_moniker: required_field(message.framework_moniker, "frameworkMoniker")?,
            runtime_version: required_field(message.runtime_version, "runtimeVersion")?,
        })
    }

    pub fn framework_moniker(&self) -> Result<String> {
        let message = self.inner.request(Request::GetFrameworkInfo)?;
        required_field(message.framework_moniker, "frameworkMoniker")
    }

    pub fn runtime_version(&self) -> Result<String> {
        let message = self.inner.request(Request::GetFrameworkInfo)?;
        required_field(message.runtime_version, "runtimeVersion")
    }

    /// Register a listener consulted when the host cannot locate an assembly.
    ///
    /// Return `Ok(Some(path))` to supply the assembly, `Ok(None)` to pass.
    pub fn add_resolving_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ResolvingEvent) -> anyhow::Result<Option<String>> + 'static,
    {
        self.inner.resolvers.add(listener)
    }

    pub fn remove_resolving_listener(&self, id: ListenerId) -> bool {
        self.inner.resolvers.remove(id)
    }

    /// Raw `Inspect` of `member` on `handle`. Bypasses the member-kind cache.
    pub fn inspect(&self, handle: &HandleId, member: &str) -> Result<HostMessage> {
        self.inner.request(Request::Inspect {
            target_id: handle.clone(),
            member_name: member.to_string(),
        })
    }

    /// Whether the session is open and the host is still running.
    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Number of handles with at least one live proxy.
    pub fn live_handles(&self) -> usize {
        self.inner.handles.len()
    }

    pub fn registered_callbacks(&self) -> usize {
        self.inner.callbacks.len()
    }
}

fn required_field(value: Option<String>, name: &str) -> Result<String> {
    value.ok_or_else(|| BridgeError::Other(format!("Host response missing {}", name)))
}
