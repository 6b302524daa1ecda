//! Inbound message handler.
//!
//! Decodes `{ "command": ..., "args": {...} }`, dispatches it, and replies to
//! the sender exactly once. A body that is not JSON at all is dropped without
//! a reply unless `reply_on_malformed` is set.

use blueprint_sdk::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinError;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::metrics::metrics;
use crate::registry::CommandRegistry;
use crate::reply::ReplyChannel;
use crate::result::CommandResult;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: String,
    pub content: String,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

#[derive(Clone)]
pub struct InboundHandler {
    registry: CommandRegistry,
    reply: ReplyChannel,
    reply_on_malformed: bool,
}

impl InboundHandler {
    pub fn new(registry: CommandRegistry, reply: ReplyChannel) -> Self {
        Self {
            registry,
            reply,
            reply_on_malformed: false,
        }
    }

    /// Reply with a decode-error payload instead of dropping undecodable bodies.
    pub fn with_reply_on_malformed(mut self, enabled: bool) -> Self {
        self.reply_on_malformed = enabled;
        self
    }

    pub async fn on_message(&self, message: &InboundMessage) {
        let request_id = Uuid::new_v4();
        info!("[{request_id}] Received message from {}", message.sender);

        let payload: Value = match serde_json::from_str(&message.content) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    "[{request_id}] Failed to parse message content: {}",
                    message.content
                );
                metrics().record_dropped_message();
                if self.reply_on_malformed {
                    let result = CommandResult::failure(
                        ErrorKind::InvalidArguments,
                        format!("Malformed message: {err}"),
                    );
                    self.reply.send(&message.sender, result.to_json());
                }
                return;
            }
        };

        let result = self.handle_payload(payload, request_id).await;
        info!(
            "[{request_id}] Replying to {} (success={})",
            message.sender,
            result.success()
        );
        self.reply.send(&message.sender, result.to_json());
    }

    async fn handle_payload(&self, payload: Value, request_id: Uuid) -> CommandResult {
        let Value::Object(mut envelope) = payload else {
            return CommandResult::failure(
                ErrorKind::InvalidArguments,
                "message payload must be a JSON object",
            );
        };

        let command = match envelope.remove("command") {
            Some(Value::String(command)) => command,
            _ => {
                return CommandResult::failure(
                    ErrorKind::InvalidArguments,
                    "command must be a string",
                );
            }
        };
        let args = match envelope.remove("args") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args,
            Some(_) => {
                return CommandResult::failure(
                    ErrorKind::InvalidArguments,
                    "args must be a JSON object",
                );
            }
        };

        // Dispatch on its own task so a panic below the registry still yields a reply.
        let registry = self.registry.clone();
        let task = tokio::spawn(async move { registry.dispatch(&command, &args).await });
        match task.await {
            Ok(result) => result,
            Err(err) => {
                let message = join_error_message(err);
                error!("[{request_id}] Error handling message: {message}");
                metrics().record_result(false, Some(ErrorKind::UnexpectedHandlerError));
                CommandResult::failure(ErrorKind::UnexpectedHandlerError, message)
            }
        }
    }
}

fn join_error_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(panic) => panic
            .downcast_ref::<&str>()
            .map(|msg| msg.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "command handler panicked".to_string()),
        Err(err) => err.to_string(),
    }
}
