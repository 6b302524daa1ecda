//! Reply channel: wraps a payload into a [`ReplyEnvelope`] and hands it to the
//! outbound transport. Fire-and-forget; delivery is the transport's business.

use std::sync::Arc;

use blueprint_sdk::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::metrics::metrics;

/// Protocol tag stamped on every reply.
pub const DEFAULT_PROTOCOL_ID: &str = "fetchai/default:1.0.0";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub to: String,
    pub sender: String,
    pub protocol_id: String,
    /// JSON-encoded payload.
    pub body: String,
}

/// Outbound transport seam.
pub trait Outbox: Send + Sync {
    fn put(&self, envelope: ReplyEnvelope);
}

/// [`Outbox`] backed by an unbounded channel. A closed receiver is logged and
/// the envelope discarded.
#[derive(Clone)]
pub struct ChannelOutbox {
    tx: mpsc::UnboundedSender<ReplyEnvelope>,
}

impl ChannelOutbox {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReplyEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Outbox for ChannelOutbox {
    fn put(&self, envelope: ReplyEnvelope) {
        if let Err(err) = self.tx.send(envelope) {
            warn!("Outbox closed, dropping reply to {}", err.0.to);
        }
    }
}

#[derive(Clone)]
pub struct ReplyChannel {
    agent_address: String,
    protocol_id: String,
    outbox: Arc<dyn Outbox>,
}

impl ReplyChannel {
    pub fn new(agent_address: impl Into<String>, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            agent_address: agent_address.into(),
            protocol_id: DEFAULT_PROTOCOL_ID.to_string(),
            outbox,
        }
    }

    pub fn agent_address(&self) -> &str {
        &self.agent_address
    }

    /// Build an envelope for `to` carrying the JSON text `body` and hand it off.
    pub fn send(&self, to: &str, body: impl Into<String>) {
        let envelope = ReplyEnvelope {
            to: to.to_string(),
            sender: self.agent_address.clone(),
            protocol_id: self.protocol_id.clone(),
            body: body.into(),
        };
        debug!("Replying to {to}: {}", envelope.body);
        self.outbox.put(envelope);
        metrics().record_reply();
    }
}
