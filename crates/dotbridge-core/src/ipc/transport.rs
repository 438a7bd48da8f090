//! Synchronous request/reply transport with re-entrant event handling.
//!
//! [`Transport::send`] writes one request and blocks until a terminal host
//! message arrives. `event` messages received in the meantime are handed to
//! the injected [`EventHandler`] and answered with a `reply` before reading
//! on. The handler may itself call `send`; the channel is never borrowed
//! across the handler call, so nested requests run to completion before the
//! outer wait resumes.

use super::channel::Channel;
use super::protocol::{decode_message, EventReply, HostMessage, MessageType, Request};
use crate::{BridgeError, Result};
use serde_json::Value as Json;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receives `event` messages while a request is outstanding.
///
/// The returned JSON is sent back as the `reply` result. Errors are logged
/// and replied as `null`; they never reach the caller of `send`.
pub trait EventHandler {
    fn handle_event(&self, event: &HostMessage) -> anyhow::Result<Json>;
}

enum ChannelState {
    Disconnected,
    Open(Channel),
    /// A read, write or decode failure happened; the stream is unusable.
    Dead,
}

/// Line-JSON transport over one [`Channel`].
pub struct Transport {
    pipe_name: String,
    connect_timeout: Duration,
    state: RefCell<ChannelState>,
    exited: Cell<bool>,
    depth: Cell<usize>,
    handler: Box<dyn EventHandler>,
}

impl Transport {
    /// Create a transport that connects to `pipe_name` on first use.
    pub fn new(
        pipe_name: impl Into<String>,
        connect_timeout: Duration,
        handler: Box<dyn EventHandler>,
    ) -> Self {
        Self {
            pipe_name: pipe_name.into(),
            connect_timeout,
            state: RefCell::new(ChannelState::Disconnected),
            exited: Cell::new(false),
            depth: Cell::new(0),
            handler,
        }
    }

    /// Create a transport over an already-open channel.
    pub fn with_channel(channel: Channel, handler: Box<dyn EventHandler>) -> Self {
        Self {
            pipe_name: String::new(),
            connect_timeout: Duration::ZERO,
            state: RefCell::new(ChannelState::Open(channel)),
            exited: Cell::new(false),
            depth: Cell::new(0),
            handler,
        }
    }

    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.borrow(), ChannelState::Open(_))
    }

    pub fn is_exited(&self) -> bool {
        self.exited.get()
    }

    /// Establish the channel if it is not open yet.
    pub fn connect(&self) -> Result<()> {
        match *self.state.borrow() {
            ChannelState::Open(_) => return Ok(()),
            ChannelState::Dead => return Err(BridgeError::ChannelDead),
            ChannelState::Disconnected => {}
        }

        let channel = Channel::connect(&self.pipe_name, self.connect_timeout)?;
        *self.state.borrow_mut() = ChannelState::Open(channel);
        Ok(())
    }

    /// Drop the channel. Later sends fail with [`BridgeError::Closed`].
    pub fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.state.borrow_mut(), ChannelState::Disconnected);
        if matches!(previous, ChannelState::Open(_)) {
            info!("Disconnected from host pipe");
        }
    }

    /// Send `request` and wait for its terminal response.
    ///
    /// After an `exit` message every call returns an exit response without
    /// touching the channel.
    pub fn send(&self, request: &Request) -> Result<HostMessage> {
        if self.exited.get() {
            return Ok(HostMessage::exit());
        }

        let depth = self.depth.get();
        debug!("-> [{}] {}", depth, request.action());
        self.io(|channel| channel.send_line(request))?;

        self.depth.set(depth + 1);
        let outcome = self.await_terminal(request);
        self.depth.set(depth);
        outcome
    }

    fn await_terminal(&self, request: &Request) -> Result<HostMessage> {
        loop {
            let line = match self.io(|channel| channel.recv_line())? {
                Some(line) => line,
                None => {
                    self.mark_dead();
                    return Err(BridgeError::TransportRead {
                        message: "Read EOF".to_string(),
                        source: None,
                    });
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let message = match decode_message(&line) {
                Ok(message) => message,
                Err(e) => {
                    self.mark_dead();
                    return Err(e);
                }
            };

            match message.kind {
                MessageType::Event => {
                    self.dispatch_event(&message);
                    // A nested request inside the handler may have seen `exit`.
                    if self.exited.get() {
                        return Ok(HostMessage::exit());
                    }
                    continue;
                }
                MessageType::Error => {
                    let text = message.message.unwrap_or_default();
                    debug!("<- {} failed: {}", request.action(), text);
                    return Err(BridgeError::Host { message: text });
                }
                MessageType::Exit => {
                    info!("Host signalled exit");
                    self.exited.set(true);
                    return Ok(message);
                }
                kind => {
                    debug!("<- {:?} for {}", kind, request.action());
                    return Ok(message);
                }
            }
        }
    }

    fn dispatch_event(&self, event: &HostMessage) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle_event(event)));
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Callback Error: {:#}", e);
                Json::Null
            }
            Err(_) => {
                error!("Callback panicked while handling event {:?}", event.callback_id);
                Json::Null
            }
        };

        if self.exited.get() {
            debug!("Host exited during event {:?}, not replying", event.callback_id);
            return;
        }
        if let Err(e) = self.io(|channel| channel.send_line(&EventReply::new(result))) {
            warn!("Failed to send event reply: {}", e);
        }
    }

    /// Run `f` against the open channel, marking it dead on fatal failure.
    fn io<T>(&self, f: impl FnOnce(&mut Channel) -> Result<T>) -> Result<T> {
        let mut state = self.state.borrow_mut();
        let channel = match &mut *state {
            ChannelState::Open(channel) => channel,
            ChannelState::Dead => return Err(BridgeError::ChannelDead),
            ChannelState::Disconnected => return Err(BridgeError::Closed),
        };

        let result = f(channel);
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!("Host channel failed: {}", e);
                *state = ChannelState::Dead;
            }
        }
        result
    }

    fn mark_dead(&self) {
        *self.state.borrow_mut() = ChannelState::Dead;
    }
}
