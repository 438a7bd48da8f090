use super::value::Value;
use crate::session::SessionInner;
use crate::Result;
use std::fmt;
use std::rc::Rc;

/// A dotted name prefix such as `System.Collections`.
///
/// Nothing is sent to the host until a member is read with [`get`](Self::get).
#[derive(Clone)]
pub struct NamespaceProxy {
    session: Rc<SessionInner>,
    name: String,
}

impl fmt::Debug for NamespaceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamespaceProxy").field(&self.name).finish()
    }
}

impl NamespaceProxy {
    pub(crate) fn new(session: Rc<SessionInner>, name: impl Into<String>) -> Self {
        Self {
            session,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified name of `member` under this namespace.
    pub fn qualify(&self, member: &str) -> String {
        if self.name.is_empty() {
            member.to_string()
        } else {
            format!("{}.{}", self.name, member)
        }
    }

    /// Extend the prefix by one segment without contacting the host.
    pub fn child(&self, segment: &str) -> NamespaceProxy {
        NamespaceProxy::new(self.session.clone(), self.qualify(segment))
    }

    /// Look up `<name>.<member>` on the host.
    pub fn get(&self, member: &str) -> Result<Value> {
        self.session.get_type(&self.qualify(member))
    }
}
