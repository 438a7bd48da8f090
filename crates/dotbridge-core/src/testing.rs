//! In-memory host used by unit tests.
//!
//! Every complete line the client writes is parsed, recorded and handed to a
//! responder; whatever the responder returns is queued for the client to
//! read. Reads on an empty queue report EOF.

use crate::ipc::Channel;
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::rc::Rc;

type Responder = Box<dyn FnMut(&Json) -> Vec<Json>>;

struct MockState {
    inbox: VecDeque<u8>,
    partial: Vec<u8>,
    written: Vec<Json>,
    responder: Responder,
}

#[derive(Clone)]
pub(crate) struct MockHost {
    state: Rc<RefCell<MockState>>,
}

impl MockHost {
    pub(crate) fn new(responder: impl FnMut(&Json) -> Vec<Json> + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                inbox: VecDeque::new(),
                partial: Vec::new(),
                written: Vec::new(),
                responder: Box::new(responder),
            })),
        }
    }

    /// Answer the n-th written line with the n-th batch.
    pub(crate) fn scripted(batches: Vec<Vec<Json>>) -> Self {
        let mut batches = VecDeque::from(batches);
        Self::new(move |_| batches.pop_front().unwrap_or_default())
    }

    pub(crate) fn channel(&self) -> Channel {
        Channel::new(MockReader(self.state.clone()), MockWriter(self.state.clone()))
    }

    pub(crate) fn push_raw(&self, text: &str) {
        self.state.borrow_mut().inbox.extend(text.as_bytes());
    }

    /// Every line written by the client, requests and replies alike.
    pub(crate) fn written(&self) -> Vec<Json> {
        self.state.borrow().written.clone()
    }

    pub(crate) fn requests(&self) -> Vec<Json> {
        self.written()
            .into_iter()
            .filter(|line| line.get("action").is_some())
            .collect()
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r["action"].as_str().map(str::to_string))
            .collect()
    }

    pub(crate) fn replies(&self) -> Vec<Json> {
        self.written()
            .into_iter()
            .filter(|line| line["type"] == "reply")
            .collect()
    }
}

struct MockReader(Rc<RefCell<MockState>>);

impl Read for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut state = self.0.borrow_mut();
        let n = buf.len().min(state.inbox.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

struct MockWriter(Rc<RefCell<MockState>>);

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        state.partial.extend_from_slice(buf);

        while let Some(pos) = state.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = state.partial.drain(..=pos).collect();
            let parsed: Json = serde_json::from_slice(&line[..line.len() - 1])
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            state.written.push(parsed.clone());

            for response in (state.responder)(&parsed) {
                state.inbox.extend(response.to_string().into_bytes());
                state.inbox.push_back(b'\n');
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
