use serde_json::{Map, Value};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::context::{ChainContext, ContractAddresses};
use crate::error::{BridgeError, Result};
use crate::util::{parse_flag, parse_json_object};
use crate::{
    DEFAULT_AGENT_ADDRESS, DEFAULT_AUTOSTAKE_INTERVAL_SECS, DEFAULT_CHAIN_ID,
    DEFAULT_SCRIPT_EXTENSION, DEFAULT_SCRIPT_INTERPRETER, DEFAULT_TARGET_CHAIN,
};

/// How scripts are located and run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Absolute scripts root.
    pub scripts_dir: PathBuf,
    /// Program that runs a script (`node`). `None` executes the script itself.
    pub interpreter: Option<String>,
    /// Extension appended to the internal command name. Empty for none.
    pub script_extension: String,
    /// Bounded wait for a child process. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Hold one lock across all invocations (they share a signing key).
    pub serialize_invocations: bool,
    /// Forward `DEBUG=true` to scripts.
    pub debug: bool,
}

impl BridgeConfig {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            interpreter: Some(DEFAULT_SCRIPT_INTERPRETER.to_string()),
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            timeout: None,
            serialize_invocations: false,
            debug: false,
        }
    }
}

/// Autostake scheduler settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AutostakeConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Default create-position arguments; the live chain id is merged in per tick.
    pub template: Map<String, Value>,
}

/// Everything the agent needs, resolved once at startup.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub chain: ChainContext,
    pub bridge: BridgeConfig,
    pub autostake: AutostakeConfig,
    pub debug: bool,
    pub reply_on_malformed: bool,
    pub agent_address: String,
}

impl AgentConfig {
    /// Load from the process environment. Relative script roots resolve
    /// against the directory of the running executable.
    pub fn load() -> Result<Self> {
        let base = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_lookup(|key| env::var(key).ok(), &base)
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F, base_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let target_chain = get("TARGET_CHAIN")
            .unwrap_or_else(|| DEFAULT_TARGET_CHAIN.to_string())
            .trim()
            .to_ascii_uppercase();
        let chain_id = match get("CHAIN_ID") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                BridgeError::Config(format!("CHAIN_ID must be an unsigned integer, got '{value}'"))
            })?,
            None => DEFAULT_CHAIN_ID,
        };
        let per_chain = |suffix: &str| get(&format!("{target_chain}_{suffix}")).unwrap_or_default();

        let chain = ChainContext {
            chain_id,
            rpc_url: per_chain("RPC_URL"),
            contracts: ContractAddresses {
                factory: per_chain("UNISWAP_FACTORY_ADDRESS"),
                router: per_chain("UNISWAP_ROUTER_ADDRESS"),
                position_manager: per_chain("UNISWAP_NFT_MANAGER_ADDRESS"),
            },
            private_key: get("PRIVATE_KEY").unwrap_or_default(),
            target_chain,
        };

        let debug = parse_flag(get("DEBUG").as_deref());

        let scripts_dir = match get("SCRIPTS_DIR") {
            Some(dir) if Path::new(&dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => base_dir.join(dir),
            None => base_dir.join("scripts"),
        };
        let interpreter = match lookup("SCRIPT_INTERPRETER") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_string()),
            None => Some(DEFAULT_SCRIPT_INTERPRETER.to_string()),
        };
        let script_extension = match lookup("SCRIPT_EXTENSION") {
            Some(value) => value.trim().trim_start_matches('.').to_string(),
            None => DEFAULT_SCRIPT_EXTENSION.to_string(),
        };
        let timeout_secs = parse_secs(get("SCRIPT_TIMEOUT_SECS"), "SCRIPT_TIMEOUT_SECS", 0)?;

        let bridge = BridgeConfig {
            scripts_dir,
            interpreter,
            script_extension,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            serialize_invocations: parse_flag(get("SERIALIZE_INVOCATIONS").as_deref()),
            debug,
        };

        let template = match get("STAKING_CONFIG_JSON") {
            Some(raw) => match parse_json_object(&raw, "STAKING_CONFIG_JSON")
                .map_err(BridgeError::Config)?
            {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        let interval_secs = parse_secs(
            get("AUTOSTAKE_INTERVAL_SECS"),
            "AUTOSTAKE_INTERVAL_SECS",
            DEFAULT_AUTOSTAKE_INTERVAL_SECS,
        )?;
        if interval_secs == 0 {
            return Err(BridgeError::Config(
                "AUTOSTAKE_INTERVAL_SECS must be greater than zero".into(),
            ));
        }

        let autostake = AutostakeConfig {
            enabled: parse_flag(get("AUTOSTAKE").as_deref()),
            interval: Duration::from_secs(interval_secs),
            template,
        };

        Ok(AgentConfig {
            chain,
            bridge,
            autostake,
            debug,
            reply_on_malformed: parse_flag(get("REPLY_ON_MALFORMED").as_deref()),
            agent_address: get("AGENT_ADDRESS")
                .unwrap_or_else(|| DEFAULT_AGENT_ADDRESS.to_string()),
        })
    }
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<u64> {
    match value {
        Some(value) => value.trim().parse::<u64>().map_err(|_| {
            BridgeError::Config(format!("{key} must be a number of seconds, got '{value}'"))
        }),
        None => Ok(default),
    }
}
