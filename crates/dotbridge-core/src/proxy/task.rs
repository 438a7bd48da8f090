//! Remote tasks.
//!
//! The transport is synchronous, so a `task` descriptor is awaited on the host
//! as soon as it is decoded. The settled outcome is exposed both as a plain
//! [`wait`](PendingTask::wait) and through [`IntoFuture`] for async callers.

use super::value::Value;
use crate::ipc::{HandleId, Request};
use crate::session::SessionInner;
use crate::Result;
use futures::future::{ready, Ready};
use std::future::IntoFuture;
use std::rc::Rc;
use tracing::debug;

/// The settled outcome of a remote task.
#[derive(Debug)]
pub struct PendingTask {
    task_id: HandleId,
    outcome: Result<Box<Value>>,
}

impl PendingTask {
    /// Send `AwaitTask` for `task_id`, then release the task handle whatever
    /// the outcome.
    pub(crate) fn await_remote(session: &Rc<SessionInner>, task_id: HandleId) -> Self {
        debug!("Awaiting remote task {}", task_id);
        let outcome = session
            .request_value(Request::AwaitTask {
                task_id: task_id.clone(),
            })
            .map(Box::new);
        session.release_quietly(&task_id);

        Self { task_id, outcome }
    }

    pub fn task_id(&self) -> &HandleId {
        &self.task_id
    }

    pub fn is_fulfilled(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn is_rejected(&self) -> bool {
        self.outcome.is_err()
    }

    /// Take the task's value, or the error it was rejected with.
    pub fn wait(self) -> Result<Value> {
        self.outcome.map(|value| *value)
    }
}

impl IntoFuture for PendingTask {
    type Output = Result<Value>;
    type IntoFuture = Ready<Result<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.wait())
    }
}
