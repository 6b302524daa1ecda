//! Liquidity Agent Blueprint
//!
//! Bridges liquidity-management commands (create, add, remove, collect,
//! close) to external position scripts. Commands arrive from the autostake
//! timer or from other agents; each one is validated against its schema, run
//! as a single child process, and answered with the script's JSON output.

pub mod autostake;
pub mod bridge;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod inbound;
pub mod jobs;
pub mod metrics;
pub mod registry;
pub mod reply;
pub mod result;
pub mod util;

use std::sync::Arc;

use blueprint_sdk::Job;
use blueprint_sdk::Router;
use blueprint_sdk::alloy::sol;
use blueprint_sdk::tangle::TangleLayer;
use once_cell::sync::OnceCell;

pub use autostake::Autostake;
pub use blueprint_sdk::tangle;
pub use bridge::{CommandExecutor, ProcessBridge};
pub use command::{Command, CommandRequest};
pub use config::{AgentConfig, AutostakeConfig, BridgeConfig};
pub use context::{ChainContext, ContractAddresses};
pub use error::{BridgeError, ErrorKind};
pub use inbound::{InboundHandler, InboundMessage};
pub use jobs::message::{agent_message, run_agent_message};
pub use jobs::position::{
    add_liquidity, close_position, collect_fees, create_position, remove_liquidity, run_command,
};
pub use registry::CommandRegistry;
pub use reply::{ChannelOutbox, Outbox, ReplyChannel, ReplyEnvelope};
pub use result::CommandResult;

/// Job IDs for position commands (write-only).
pub const JOB_CREATE_POSITION: u8 = 0;
pub const JOB_ADD_LIQUIDITY: u8 = 1;
pub const JOB_REMOVE_LIQUIDITY: u8 = 2;
pub const JOB_COLLECT_FEES: u8 = 3;
pub const JOB_CLOSE_POSITION: u8 = 4;

/// Job ID for raw agent-to-agent messages.
pub const JOB_AGENT_MESSAGE: u8 = 10;

pub const DEFAULT_TARGET_CHAIN: &str = "ETHEREUM";
pub const DEFAULT_CHAIN_ID: u64 = 1;
pub const DEFAULT_AUTOSTAKE_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_SCRIPT_INTERPRETER: &str = "node";
pub const DEFAULT_SCRIPT_EXTENSION: &str = "js";
pub const DEFAULT_AGENT_ADDRESS: &str = "liquidity-agent";

sol! {
    /// Generic JSON response payload.
    struct JsonResponse {
        string json;
    }

    /// Open a new position. Amounts are decimal strings.
    struct CreatePositionRequest {
        string token0;
        string token1;
        uint32 fee;
        string amount0;
        string amount1;
        uint32 slippage;
        uint64 chain_id;
    }

    /// Add liquidity to an existing position.
    struct AddLiquidityRequest {
        string token_id;
        string amount0;
        string amount1;
        uint32 slippage;
        uint64 chain_id;
    }

    /// Remove a percentage of a position's liquidity.
    struct RemoveLiquidityRequest {
        string token_id;
        string percent;
        uint32 slippage;
        uint64 chain_id;
    }

    /// Collect accrued fees.
    struct CollectFeesRequest {
        string token_id;
        uint64 chain_id;
    }

    /// Withdraw everything, collect fees, and burn the position.
    struct ClosePositionRequest {
        string token_id;
        uint32 slippage;
        uint64 chain_id;
    }

    /// Raw agent message. `content` is the JSON envelope `{command, args}`;
    /// an empty `sender` falls back to the job caller's address.
    struct AgentMessage {
        string sender;
        string content;
    }
}

/// Shared state the job handlers dispatch through.
#[derive(Clone)]
pub struct AgentContext {
    pub registry: CommandRegistry,
    pub agent_address: String,
    pub reply_on_malformed: bool,
}

impl AgentContext {
    /// Wire the process bridge and registry from resolved configuration.
    pub fn from_config(config: &AgentConfig) -> Self {
        let chain = Arc::new(config.chain.clone());
        let bridge = ProcessBridge::new(config.bridge.clone(), chain);
        Self {
            registry: CommandRegistry::new(Arc::new(bridge)),
            agent_address: config.agent_address.clone(),
            reply_on_malformed: config.reply_on_malformed,
        }
    }
}

static AGENT: OnceCell<AgentContext> = OnceCell::new();

/// Initialize the agent context. Must be called once at startup.
pub fn init_agent(ctx: AgentContext) -> Result<(), String> {
    AGENT
        .set(ctx)
        .map_err(|_| "Agent context already initialized".to_string())
}

/// Get the agent context.
pub fn agent() -> Result<&'static AgentContext, String> {
    AGENT
        .get()
        .ok_or_else(|| "Agent context not initialized".to_string())
}

/// Router that maps job IDs to handlers.
pub fn router() -> Router {
    Router::new()
        .route(JOB_CREATE_POSITION, create_position.layer(TangleLayer))
        .route(JOB_ADD_LIQUIDITY, add_liquidity.layer(TangleLayer))
        .route(JOB_REMOVE_LIQUIDITY, remove_liquidity.layer(TangleLayer))
        .route(JOB_COLLECT_FEES, collect_fees.layer(TangleLayer))
        .route(JOB_CLOSE_POSITION, close_position.layer(TangleLayer))
        .route(JOB_AGENT_MESSAGE, agent_message.layer(TangleLayer))
}
