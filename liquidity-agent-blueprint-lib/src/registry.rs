//! Command registry: name → schema → executor.
//!
//! Single attempt, fail-fast. Nothing below this boundary escapes as an
//! error; unknown names and bad arguments become failed results without
//! touching the executor.

use std::sync::Arc;

use blueprint_sdk::{info, warn};
use serde_json::{Map, Value};

use crate::bridge::CommandExecutor;
use crate::command::{Command, CommandRequest};
use crate::error::BridgeError;
use crate::metrics::metrics;
use crate::result::CommandResult;

#[derive(Clone)]
pub struct CommandRegistry {
    executor: Arc<dyn CommandExecutor>,
}

impl CommandRegistry {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Look up `name`, validate `args` against its schema, and run it once.
    pub async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> CommandResult {
        let command = match name.parse::<Command>() {
            Ok(command) => command,
            Err(err) => return self.reject(err),
        };

        match CommandRequest::from_args(command, args) {
            Ok(request) => self.submit(&request).await,
            Err(err) => self.reject(err),
        }
    }

    /// Run an already validated request.
    pub async fn submit(&self, request: &CommandRequest) -> CommandResult {
        info!(
            "Processing command: {} with args: {:?}",
            request.command(),
            request.args()
        );
        let result = self.executor.submit(request).await;
        metrics().record_result(result.success(), result.error_kind());
        result
    }

    fn reject(&self, err: BridgeError) -> CommandResult {
        warn!("Rejected command: {err}");
        let result = CommandResult::from(err);
        metrics().record_result(false, result.error_kind());
        result
    }
}
