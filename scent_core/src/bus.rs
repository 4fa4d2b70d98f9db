//! Message-bus seams: outbound envelopes, the `Outbox` sink and the
//! `MessageSource` feeding the reception thread.

use crossbeam_channel as xch;
use serde_json::{Value, json};
use std::time::Duration;

/// Values of the `status` field on the feedback topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Possible,
    Impossible,
    Complete,
    Error,
}

impl StatusKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Possible => "possible",
            Self::Impossible => "impossible",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Recipe lifecycle status.
    Status(StatusKind),
    /// Reply to `check`: `(slot_id, current_ml)` rows.
    Inventory(Vec<(u32, u32)>),
    /// Reply to `connect`.
    Connect,
    /// Reply to `update`; `Complete` or `Error`.
    Update(StatusKind),
}

impl Outbound {
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Status(s) => json!({ "CMD": "status", "data": { "status": s.as_str() } }),
            Self::Inventory(rows) => {
                let data: Vec<Value> = rows
                    .iter()
                    .map(|(id, ml)| json!({ "slotId": id, "capacityMl": ml }))
                    .collect();
                json!({ "CMD": "check", "data": data })
            }
            Self::Connect => json!({ "CMD": "connect" }),
            Self::Update(s) => json!({ "CMD": "update", "data": { "status": s.as_str() } }),
        }
    }

    #[must_use]
    pub const fn status(&self) -> Option<StatusKind> {
        match self {
            Self::Status(s) => Some(*s),
            _ => None,
        }
    }
}

/// Fire-and-forget sink for outbound envelopes.
pub trait Outbox: Send + Sync {
    fn publish(&self, msg: Outbound);
}

impl<T: Outbox + ?Sized> Outbox for std::sync::Arc<T> {
    fn publish(&self, msg: Outbound) {
        (**self).publish(msg);
    }
}

/// Outbox backed by an unbounded crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelOutbox {
    tx: xch::Sender<Outbound>,
}

impl ChannelOutbox {
    #[must_use]
    pub fn channel() -> (Self, xch::Receiver<Outbound>) {
        let (tx, rx) = xch::unbounded();
        (Self { tx }, rx)
    }
}

impl Outbox for ChannelOutbox {
    fn publish(&self, msg: Outbound) {
        if self.tx.send(msg).is_err() {
            tracing::debug!("outbound consumer disconnected; message dropped");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Message(String),
    /// Nothing arrived within the timeout.
    Idle,
    /// The transport is gone for good.
    Closed,
}

/// Inbound payload source polled by the reception thread.
pub trait MessageSource {
    fn next(&mut self, timeout: Duration) -> Delivery;
}

#[derive(Debug)]
pub struct ChannelSource {
    rx: xch::Receiver<String>,
}

impl ChannelSource {
    #[must_use]
    pub const fn new(rx: xch::Receiver<String>) -> Self {
        Self { rx }
    }
}

impl MessageSource for ChannelSource {
    fn next(&mut self, timeout: Duration) -> Delivery {
        match self.rx.recv_timeout(timeout) {
            Ok(m) => Delivery::Message(m),
            Err(xch::RecvTimeoutError::Timeout) => Delivery::Idle,
            Err(xch::RecvTimeoutError::Disconnected) => Delivery::Closed,
        }
    }
}
