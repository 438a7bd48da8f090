//! Client values passed to the host as method, constructor or setter arguments.

use super::object::ObjectProxy;
use super::value::Value;
use crate::config::ProtocolConfig;
use crate::session::SessionInner;
use serde_json::{json, Map, Value as Json};
use std::fmt;
use std::rc::Rc;

type CallbackFn = dyn Fn(Vec<Value>) -> anyhow::Result<Arg>;

/// A client function the host may invoke.
///
/// Arguments arrive decoded as [`Value`]s; the returned [`Arg`] is marshaled
/// back as the event reply. Errors are logged and replied as `null`.
#[derive(Clone)]
pub struct Callback(Rc<CallbackFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Arg> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: Vec<Value>) -> anyhow::Result<Arg> {
        (self.0)(args)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// One outgoing argument.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Sent verbatim.
    Json(Json),
    /// Sent as a `{"__ref": id}` token.
    Object(ObjectProxy),
    /// Registered and sent as a callback token.
    Callback(Callback),
    /// Marshaled element-wise.
    Array(Vec<Arg>),
}

impl Arg {
    pub fn null() -> Self {
        Arg::Json(Json::Null)
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Arg> + 'static,
    {
        Arg::Callback(Callback::new(f))
    }
}

impl Default for Arg {
    fn default() -> Self {
        Arg::null()
    }
}

macro_rules! impl_json_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Json(Json::from(value))
                }
            }
        )*
    };
}

impl_json_arg!(bool, i32, i64, u32, u64, f64, &str, String);

impl From<Json> for Arg {
    fn from(value: Json) -> Self {
        Arg::Json(value)
    }
}

impl From<ObjectProxy> for Arg {
    fn from(proxy: ObjectProxy) -> Self {
        Arg::Object(proxy)
    }
}

impl From<&ObjectProxy> for Arg {
    fn from(proxy: &ObjectProxy) -> Self {
        Arg::Object(proxy.clone())
    }
}

impl From<Callback> for Arg {
    fn from(callback: Callback) -> Self {
        Arg::Callback(callback)
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self {
        Arg::Array(items)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Arg::null, Into::into)
    }
}

/// Pass a received value back to the host.
///
/// Namespaces travel as their dotted name. A task passes its fulfilled value,
/// or `null` if it was rejected.
impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Arg::null(),
            Value::Primitive(v) => Arg::Json(v),
            Value::Namespace(ns) => Arg::Json(Json::String(ns.name().to_string())),
            Value::Object(proxy) => Arg::Object(proxy),
            Value::Array(items) => Arg::Array(items.into_iter().map(Arg::from).collect()),
            Value::Task(task) => task.wait().map_or_else(|_| Arg::null(), Arg::from),
        }
    }
}

/// Convert `arg` to its wire form, registering callbacks under `callback_prefix`.
///
/// Borrows the argument: proxies must stay alive until the request that
/// carries their token has completed.
pub(crate) fn marshal(session: &SessionInner, arg: &Arg, callback_prefix: &str) -> Json {
    match arg {
        Arg::Json(value) => value.clone(),
        Arg::Object(proxy) => {
            let mut token = Map::new();
            token.insert(
                ProtocolConfig::REF_KEY.to_string(),
                Json::String(proxy.id().as_str().to_string()),
            );
            Json::Object(token)
        }
        Arg::Callback(callback) => {
            let id = session.callbacks.register(callback_prefix, callback.clone());
            json!({
                "type": ProtocolConfig::CALLBACK_TOKEN_TYPE,
                "callbackId": id,
            })
        }
        Arg::Array(items) => Json::Array(
            items
                .iter()
                .map(|item| marshal(session, item, callback_prefix))
                .collect(),
        ),
    }
}

pub(crate) fn marshal_all(session: &SessionInner, args: &[Arg], callback_prefix: &str) -> Vec<Json> {
    args.iter()
        .map(|arg| marshal(session, arg, callback_prefix))
        .collect()
}
