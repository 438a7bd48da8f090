//! Wire protocol types and line framing.
//!
//! Every message is one UTF-8 JSON object terminated by `\n`:
//!
//! ```text
//! {"action":"GetType","typeName":"System.Math"}\n
//! {"type":"ref","id":"h1"}\n
//! ```
//!
//! Requests flow client → host and carry an `action` tag. Host messages carry a
//! `type` tag. While a request is outstanding the host may interleave `event`
//! messages, each answered by exactly one client `reply`.

use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::io::{BufRead, Write};

/// Opaque identifier of a live remote object, minted by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(String);

impl HandleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HandleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Classification of a handle's named member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Property,
    Method,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Property => "property",
            MemberKind::Method => "method",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "property" => Some(MemberKind::Property),
            "method" => Some(MemberKind::Method),
            _ => None,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client → host request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum Request {
    GetType {
        type_name: String,
    },
    Inspect {
        target_id: HandleId,
        member_name: String,
    },
    Invoke {
        target_id: HandleId,
        method_name: String,
        args: Vec<Json>,
    },
    New {
        type_id: HandleId,
        args: Vec<Json>,
    },
    AddEvent {
        target_id: HandleId,
        event_name: String,
        callback_id: String,
    },
    Release {
        target_id: HandleId,
    },
    AwaitTask {
        task_id: HandleId,
    },
    LoadAssembly {
        assembly_path: String,
    },
    RequireModule {
        assembly_path: String,
    },
    Resolved {
        resolved_path: String,
        callback_id: Option<String>,
    },
    GetFrameworkInfo,
}

impl Request {
    /// Action name as it appears on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            Request::GetType { .. } => "GetType",
            Request::Inspect { .. } => "Inspect",
            Request::Invoke { .. } => "Invoke",
            Request::New { .. } => "New",
            Request::AddEvent { .. } => "AddEvent",
            Request::Release { .. } => "Release",
            Request::AwaitTask { .. } => "AwaitTask",
            Request::LoadAssembly { .. } => "LoadAssembly",
            Request::RequireModule { .. } => "RequireModule",
            Request::Resolved { .. } => "Resolved",
            Request::GetFrameworkInfo => "GetFrameworkInfo",
        }
    }
}

/// The `type` tag of a host message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Primitive,
    Null,
    Namespace,
    Ref,
    Array,
    Task,
    Event,
    Error,
    Reply,
    Exit,
    /// Any tag this client does not know. Still terminal.
    #[serde(other)]
    Unknown,
}

/// Host → client message.
///
/// One flat struct covers every message type; which fields are present
/// depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<HandleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_moniker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_path: Option<String>,
}

impl HostMessage {
    /// Create an empty message of the given type.
    pub fn of_kind(kind: MessageType) -> Self {
        Self {
            kind,
            value: None,
            id: None,
            props: None,
            args: None,
            message: None,
            callback_id: None,
            member_type: None,
            assembly_name: None,
            assembly_version: None,
            framework_moniker: None,
            runtime_version: None,
            resolved_path: None,
        }
    }

    /// The synthetic response returned once the host has exited.
    pub fn exit() -> Self {
        Self {
            message: Some(String::new()),
            ..Self::of_kind(MessageType::Exit)
        }
    }

    /// `event` messages are never terminal; everything else ends a request.
    pub fn is_terminal(&self) -> bool {
        self.kind != MessageType::Event
    }

    pub fn is_exit(&self) -> bool {
        self.kind == MessageType::Exit
    }

    /// Parsed member kind of an `Inspect` response.
    pub fn member_kind(&self) -> Option<MemberKind> {
        self.member_type.as_deref().and_then(MemberKind::parse)
    }
}

/// Decoded form of a value-bearing host message.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueDescriptor {
    /// Inline value, including `null`.
    Primitive(Json),
    /// Dotted namespace prefix.
    Namespace(String),
    /// Remote object, optionally with a snapshot of its property values.
    Ref {
        id: HandleId,
        props: Option<Map<String, Json>>,
    },
    Array(Vec<ValueDescriptor>),
    /// Pending asynchronous remote computation.
    Task(HandleId),
    /// Anything else. Carries the reason for logging.
    Unrecognized(String),
}

impl ValueDescriptor {
    pub fn from_message(message: HostMessage) -> Self {
        match message.kind {
            MessageType::Primitive | MessageType::Null => {
                ValueDescriptor::Primitive(message.value.unwrap_or(Json::Null))
            }
            MessageType::Namespace => match message.value {
                Some(Json::String(name)) => ValueDescriptor::Namespace(name),
                other => ValueDescriptor::Unrecognized(format!(
                    "namespace without a name: {:?}",
                    other
                )),
            },
            MessageType::Ref => match message.id {
                Some(id) => ValueDescriptor::Ref {
                    id,
                    props: message.props,
                },
                None => ValueDescriptor::Unrecognized("ref without an id".to_string()),
            },
            MessageType::Array => match message.value {
                Some(Json::Array(items)) => {
                    ValueDescriptor::Array(items.into_iter().map(Self::from_json).collect())
                }
                other => ValueDescriptor::Unrecognized(format!(
                    "array without elements: {:?}",
                    other
                )),
            },
            MessageType::Task => match message.id {
                Some(id) => ValueDescriptor::Task(id),
                None => ValueDescriptor::Unrecognized("task without an id".to_string()),
            },
            other => ValueDescriptor::Unrecognized(format!("message type {:?}", other)),
        }
    }

    /// Decode a nested descriptor (array element or event argument).
    ///
    /// Elements without a string `type` tag are plain inline values.
    pub fn from_json(value: Json) -> Self {
        let tagged = value.get("type").is_some_and(Json::is_string);
        if !tagged {
            return ValueDescriptor::Primitive(value);
        }
        match serde_json::from_value::<HostMessage>(value) {
            Ok(message) => Self::from_message(message),
            Err(e) => ValueDescriptor::Unrecognized(format!("malformed descriptor: {}", e)),
        }
    }
}

/// Client → host answer to an `event` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReply {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub result: Json,
}

impl EventReply {
    pub fn new(result: Json) -> Self {
        Self {
            kind: MessageType::Reply,
            result,
        }
    }
}

/// Read one `\n`-terminated line.
///
/// Returns `None` on EOF before any byte. A trailing `\r` is stripped and
/// invalid UTF-8 is replaced rather than rejected.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let n = reader
        .read_until(b'\n', &mut buf)
        .map_err(|e| BridgeError::TransportRead {
            message: format!("Read failed: {}", e),
            source: Some(e),
        })?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(Some(match String::from_utf8(buf) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }))
}

/// Serialize `message` and write it as one line, then flush.
pub fn write_line<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let mut payload = serde_json::to_vec(message)?;
    payload.push(b'\n');
    writer
        .write_all(&payload)
        .and_then(|_| writer.flush())
        .map_err(|source| BridgeError::TransportWrite { source })
}

/// Parse one line into a host message.
pub fn decode_message(line: &str) -> Result<HostMessage> {
    serde_json::from_str(line).map_err(|source| BridgeError::ProtocolDecode {
        line: line.to_string(),
        source,
    })
}
