//! Proxies for remote objects.
//!
//! An [`ObjectProxy`] stands for one live host handle. Member access is
//! resolved lazily: the first access of a name asks the host whether it is a
//! property or a method, and the answer is cached per handle for as long as
//! any proxy of that handle is alive.

use super::marshal::{marshal, marshal_all, Arg, Callback};
use super::value::Value;
use crate::config::ProtocolConfig;
use crate::ipc::{HandleId, MemberKind, Request};
use crate::session::SessionInner;
use crate::{BridgeError, Result};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// One decode's claim on a handle.
///
/// Dropping the last lease of a handle sends a best-effort `Release`.
pub(crate) struct HandleLease {
    id: HandleId,
    session: Rc<SessionInner>,
}

impl Drop for HandleLease {
    fn drop(&mut self) {
        self.session.drop_lease(&self.id);
    }
}

/// Client stand-in for a remote object, type or delegate.
///
/// Cloning shares the lease; the handle is released once every clone is gone.
#[derive(Clone)]
pub struct ObjectProxy {
    lease: Rc<HandleLease>,
    snapshot: Option<Rc<Map<String, Json>>>,
}

impl fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObjectProxy");
        s.field("id", &self.lease.id);
        if let Some(snapshot) = &self.snapshot {
            s.field("snapshot", &snapshot.keys().collect::<Vec<_>>());
        }
        s.finish()
    }
}

impl ObjectProxy {
    pub(crate) fn new(
        session: &Rc<SessionInner>,
        id: HandleId,
        snapshot: Option<Map<String, Json>>,
    ) -> Self {
        session.handles.acquire(&id);
        Self {
            lease: Rc::new(HandleLease {
                id,
                session: session.clone(),
            }),
            snapshot: snapshot.map(Rc::new),
        }
    }

    pub fn id(&self) -> &HandleId {
        &self.lease.id
    }

    /// Property values the host sent along with the reference, if any.
    pub fn snapshot(&self) -> Option<&Map<String, Json>> {
        self.snapshot.as_deref()
    }

    /// Cached kind of `member`, without asking the host.
    pub fn member_kind(&self, member: &str) -> Option<MemberKind> {
        self.session().handles.member_kind(self.id(), member)
    }

    fn session(&self) -> &Rc<SessionInner> {
        &self.lease.session
    }

    /// Access `member`.
    ///
    /// Snapshot entries are served without a round trip. Names starting with
    /// `add_` yield an event subscription. Properties are read immediately;
    /// methods come back as a [`BoundMethod`].
    pub fn get_member(&self, member: &str) -> Result<Member> {
        if let Some(value) = self.snapshot_value(member) {
            return Ok(Member::Value(value));
        }
        if let Some(event_name) = member.strip_prefix(ProtocolConfig::EVENT_PREFIX) {
            return Ok(Member::Event(EventSubscription {
                target: self.clone(),
                event_name: event_name.to_string(),
            }));
        }

        match self.resolve_kind(member)? {
            MemberKind::Property => self.read_property(member).map(Member::Value),
            MemberKind::Method => Ok(Member::Method(BoundMethod {
                target: self.clone(),
                name: member.to_string(),
            })),
        }
    }

    /// Read a property value. Fails with a misuse error if `member` is not one.
    pub fn get(&self, member: &str) -> Result<Value> {
        match self.get_member(member)? {
            Member::Value(value) => Ok(value),
            Member::Method(_) => Err(BridgeError::misuse(format!(
                "'{}' is a method; use invoke",
                member
            ))),
            Member::Event(_) => Err(BridgeError::misuse(format!(
                "'{}' is an event subscription; use subscribe",
                member
            ))),
        }
    }

    /// Assign `value` to property `member`.
    pub fn set_member(&self, member: &str, value: impl Into<Arg>) -> Result<()> {
        let session = self.session();
        let value = value.into();
        let wire = marshal(session, &value, ProtocolConfig::ARG_CALLBACK_PREFIX);

        session.request(Request::Invoke {
            target_id: self.id().clone(),
            method_name: member.to_string(),
            args: vec![wire],
        })?;
        session
            .handles
            .set_member_kind(self.id(), member, MemberKind::Property);
        Ok(())
    }

    /// Call method `member` with `args`.
    ///
    /// Invoking a property with no arguments reads it.
    pub fn invoke(&self, member: &str, args: Vec<Arg>) -> Result<Value> {
        if member.starts_with(ProtocolConfig::EVENT_PREFIX) {
            return Err(BridgeError::misuse(format!(
                "'{}' is an event subscription; use subscribe",
                member
            )));
        }
        if args.is_empty() {
            if let Some(value) = self.snapshot_value(member) {
                return Ok(value);
            }
        }

        match self.resolve_kind(member)? {
            MemberKind::Method => self.call_method(member, args),
            MemberKind::Property if args.is_empty() => self.read_property(member),
            MemberKind::Property => Err(BridgeError::misuse(format!(
                "'{}' is a property and takes no arguments",
                member
            ))),
        }
    }

    /// Construct an instance of the type this proxy refers to.
    pub fn construct(&self, args: Vec<Arg>) -> Result<Value> {
        let session = self.session();
        let wire = marshal_all(session, &args, ProtocolConfig::CTOR_CALLBACK_PREFIX);
        session.request_value(Request::New {
            type_id: self.id().clone(),
            args: wire,
        })
    }

    /// Subscribe `callback` to host event `event_name` (without the `add_` prefix).
    pub fn subscribe(&self, event_name: &str, callback: Callback) -> Result<()> {
        let session = self.session();
        let callback_id = session
            .callbacks
            .register(ProtocolConfig::SUBSCRIPTION_CALLBACK_PREFIX, callback);

        session.request(Request::AddEvent {
            target_id: self.id().clone(),
            event_name: event_name.to_string(),
            callback_id,
        })?;
        Ok(())
    }

    /// Remote objects are not callable. Constructors go through [`construct`](Self::construct).
    pub fn call_as_function(&self, _args: Vec<Arg>) -> Result<Value> {
        Err(BridgeError::misuse(
            "Cannot call .NET object as a function. Need 'new'?",
        ))
    }

    fn snapshot_value(&self, member: &str) -> Option<Value> {
        let value = self.snapshot.as_ref()?.get(member)?.clone();
        self.session()
            .handles
            .set_member_kind(self.id(), member, MemberKind::Property);
        Some(Value::from_json(value))
    }

    fn resolve_kind(&self, member: &str) -> Result<MemberKind> {
        let session = self.session();
        if let Some(kind) = session.handles.member_kind(self.id(), member) {
            return Ok(kind);
        }

        let response = session.request(Request::Inspect {
            target_id: self.id().clone(),
            member_name: member.to_string(),
        });
        match response {
            Ok(message) => match message.member_kind() {
                Some(kind) => {
                    session.handles.set_member_kind(self.id(), member, kind);
                    Ok(kind)
                }
                None => {
                    debug!("Inspect of {} gave no member type, treating as method", member);
                    Ok(MemberKind::Method)
                }
            },
            Err(e) if e.is_host_error() => {
                debug!("Inspect of {} failed, treating as method: {}", member, e);
                Ok(MemberKind::Method)
            }
            Err(e) => Err(e),
        }
    }

    fn read_property(&self, member: &str) -> Result<Value> {
        self.session().request_value(Request::Invoke {
            target_id: self.id().clone(),
            method_name: member.to_string(),
            args: Vec::new(),
        })
    }

    fn call_method(&self, member: &str, args: Vec<Arg>) -> Result<Value> {
        let session = self.session();
        let wire = marshal_all(session, &args, ProtocolConfig::ARG_CALLBACK_PREFIX);
        session.request_value(Request::Invoke {
            target_id: self.id().clone(),
            method_name: member.to_string(),
            args: wire,
        })
    }
}

/// Result of [`ObjectProxy::get_member`].
#[derive(Debug)]
pub enum Member {
    Value(Value),
    Method(BoundMethod),
    Event(EventSubscription),
}

impl Member {
    pub fn into_value(self) -> Result<Value> {
        match self {
            Member::Value(value) => Ok(value),
            Member::Method(m) => Err(BridgeError::misuse(format!("'{}' is a method", m.name))),
            Member::Event(e) => Err(BridgeError::misuse(format!(
                "'{}' is an event subscription",
                e.event_name
            ))),
        }
    }

    pub fn into_method(self) -> Result<BoundMethod> {
        match self {
            Member::Method(m) => Ok(m),
            _ => Err(BridgeError::misuse("Member is not a method")),
        }
    }

    pub fn into_event(self) -> Result<EventSubscription> {
        match self {
            Member::Event(e) => Ok(e),
            _ => Err(BridgeError::misuse("Member is not an event subscription")),
        }
    }
}

/// A method bound to its target object.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    target: ObjectProxy,
    name: String,
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Vec<Arg>) -> Result<Value> {
        self.target.call_method(&self.name, args)
    }
}

/// An `add_<Event>` member: subscribes callbacks to the host event.
#[derive(Debug, Clone)]
pub struct EventSubscription {
    target: ObjectProxy,
    event_name: String,
}

impl EventSubscription {
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn subscribe(&self, callback: Callback) -> Result<()> {
        self.target.subscribe(&self.event_name, callback)
    }
}
