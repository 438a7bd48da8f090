//! Decoded host values.

use super::namespace::NamespaceProxy;
use super::object::ObjectProxy;
use super::task::PendingTask;
use crate::ipc::ValueDescriptor;
use crate::session::SessionInner;
use crate::{BridgeError, Result};
use serde_json::Value as Json;
use std::rc::Rc;
use tracing::warn;

/// A value returned by the host.
#[derive(Debug)]
pub enum Value {
    Null,
    /// String, number, boolean or any other inline JSON.
    Primitive(Json),
    Namespace(NamespaceProxy),
    Object(ObjectProxy),
    Array(Vec<Value>),
    /// An awaited remote task. Already settled by the time it is observed.
    Task(PendingTask),
}

impl Value {
    pub(crate) fn from_json(value: Json) -> Self {
        if value.is_null() {
            Value::Null
        } else {
            Value::Primitive(value)
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Primitive(_) => "primitive",
            Value::Namespace(_) => "namespace",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Task(_) => "task",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_json(&self) -> Option<&Json> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Json::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(Json::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(Json::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_json().and_then(Json::as_bool)
    }

    pub fn as_object(&self) -> Option<&ObjectProxy> {
        match self {
            Value::Object(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&NamespaceProxy> {
        match self {
            Value::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn into_object(self) -> Result<ObjectProxy> {
        match self {
            Value::Object(proxy) => Ok(proxy),
            other => Err(BridgeError::misuse(format!(
                "Expected an object, got {}",
                other.kind_name()
            ))),
        }
    }

    pub fn into_namespace(self) -> Result<NamespaceProxy> {
        match self {
            Value::Namespace(ns) => Ok(ns),
            other => Err(BridgeError::misuse(format!(
                "Expected a namespace, got {}",
                other.kind_name()
            ))),
        }
    }

    pub fn into_array(self) -> Result<Vec<Value>> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(BridgeError::misuse(format!(
                "Expected an array, got {}",
                other.kind_name()
            ))),
        }
    }

    pub fn into_task(self) -> Result<PendingTask> {
        match self {
            Value::Task(task) => Ok(task),
            other => Err(BridgeError::misuse(format!(
                "Expected a task, got {}",
                other.kind_name()
            ))),
        }
    }
}

/// Build the client-side value for a host descriptor.
///
/// Every `ref` mints a new proxy lease. A `task` is awaited on the host before
/// this returns.
pub(crate) fn decode(session: &Rc<SessionInner>, descriptor: ValueDescriptor) -> Value {
    match descriptor {
        ValueDescriptor::Primitive(value) => Value::from_json(value),
        ValueDescriptor::Namespace(name) => Value::Namespace(NamespaceProxy::new(session.clone(), name)),
        ValueDescriptor::Ref { id, props } => Value::Object(ObjectProxy::new(session, id, props)),
        ValueDescriptor::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| decode(session, item))
                .collect(),
        ),
        ValueDescriptor::Task(id) => Value::Task(PendingTask::await_remote(session, id)),
        ValueDescriptor::Unrecognized(reason) => {
            warn!("Unrecognized host value ({}), using null", reason);
            Value::Null
        }
    }
}
