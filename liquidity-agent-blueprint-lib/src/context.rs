//! Chain context for the liquidity agent.
//!
//! Resolved once at startup from [`crate::config::AgentConfig`] and shared
//! read-only by the scheduler and the process bridge.

use std::fmt;

/// Environment keys the process bridge overlays onto the child environment.
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_CHAIN_ID: &str = "CHAIN_ID";
pub const ENV_FACTORY_ADDRESS: &str = "UNISWAP_FACTORY_ADDRESS";
pub const ENV_ROUTER_ADDRESS: &str = "UNISWAP_ROUTER_ADDRESS";
pub const ENV_POSITION_MANAGER_ADDRESS: &str = "UNISWAP_NFT_MANAGER_ADDRESS";
pub const ENV_PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const ENV_DEBUG: &str = "DEBUG";

/// Pool contract addresses for the active chain. Empty means "let the script
/// fall back to its own defaults".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    pub factory: String,
    pub router: String,
    pub position_manager: String,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChainContext {
    /// Network selector, e.g. `ETHEREUM`.
    pub target_chain: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    /// Hex-encoded signing key handed to scripts.
    pub private_key: String,
}

impl ChainContext {
    /// Environment overlay for a child process.
    ///
    /// Endpoint and chain id are always present; addresses and the signing key
    /// only when non-empty.
    pub fn env_overlay(&self) -> Vec<(&'static str, String)> {
        let mut overlay = vec![
            (ENV_RPC_URL, self.rpc_url.clone()),
            (ENV_CHAIN_ID, self.chain_id.to_string()),
        ];

        let optional = [
            (ENV_FACTORY_ADDRESS, &self.contracts.factory),
            (ENV_ROUTER_ADDRESS, &self.contracts.router),
            (ENV_POSITION_MANAGER_ADDRESS, &self.contracts.position_manager),
            (ENV_PRIVATE_KEY, &self.private_key),
        ];
        for (key, value) in optional {
            if !value.is_empty() {
                overlay.push((key, value.clone()));
            }
        }

        overlay
    }
}

impl fmt::Debug for ChainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.private_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("ChainContext")
            .field("target_chain", &self.target_chain)
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .field("contracts", &self.contracts)
            .field("private_key", &key)
            .finish()
    }
}
