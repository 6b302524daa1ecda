//! Autostake scheduler.
//!
//! - `tick()`: when enabled, submits one create-position built from the
//!   configured template plus the live chain id
//! - `run()`: calls `tick()` every `AUTOSTAKE_INTERVAL_SECS`, forever
//!
//! Outcomes are logged only. A failed tick neither delays nor hastens the next.

use std::time::Duration;

use blueprint_sdk::{debug, error, info};
use serde_json::Value;
use tokio::time::{Instant, MissedTickBehavior};

use crate::command::{CHAIN_ID_PARAM, Command, CommandRequest};
use crate::config::AutostakeConfig;
use crate::context::ChainContext;
use crate::error::Result;
use crate::metrics::metrics;
use crate::registry::CommandRegistry;
use crate::result::CommandResult;

#[derive(Clone)]
pub struct Autostake {
    config: AutostakeConfig,
    chain_id: u64,
    registry: CommandRegistry,
}

impl Autostake {
    pub fn new(config: AutostakeConfig, chain: &ChainContext, registry: CommandRegistry) -> Self {
        Self {
            config,
            chain_id: chain.chain_id,
            registry,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// The template with the live chain id merged in. Any chain id the
    /// template carries, under either spelling, is replaced.
    pub fn build_request(&self) -> Result<CommandRequest> {
        let mut args = self.config.template.clone();
        args.remove("chain_id");
        args.insert(CHAIN_ID_PARAM.to_string(), Value::from(self.chain_id));
        CommandRequest::from_args(Command::CreatePosition, &args)
    }

    /// One scheduler step. Returns `None` when autostake is disabled.
    pub async fn tick(&self) -> Option<CommandResult> {
        if !self.config.enabled {
            debug!("autostake: disabled, skipping tick");
            return None;
        }

        let m = metrics();
        m.record_autostake_tick();

        let result = match self.build_request() {
            Ok(request) => self.registry.submit(&request).await,
            Err(err) => {
                error!("autostake: invalid template: {err}");
                let result = CommandResult::from(err);
                m.record_result(false, result.error_kind());
                result
            }
        };

        info!("Autostake executed with result: {}", result.to_json());
        debug!("autostake: metrics {:?}", m.snapshot());
        Some(result)
    }

    /// Tick forever at the fixed interval. The first tick fires one interval
    /// after start.
    pub async fn run(self) {
        let period = self.config.interval;
        info!(
            "autostake: running every {}s (enabled={})",
            period.as_secs(),
            self.config.enabled
        );

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
