//! Command schema.
//!
//! Each command owns an ordered parameter list. Requests are validated and
//! normalized against it before the process bridge sees them, and positional
//! arguments are always produced in schema order.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    CreatePosition,
    AddLiquidity,
    RemoveLiquidity,
    CollectFees,
    ClosePosition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Token symbol, e.g. `WETH`.
    Symbol,
    /// Unsigned integer: fee tier, slippage in basis points, chain id.
    Uint,
    /// Non-negative decimal amount.
    Amount,
    /// Decimal in `(0, 100]`.
    Percent,
    /// Position NFT id, string or integer.
    PositionId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub alias: &'static str,
    pub kind: ParamKind,
}

const fn param(name: &'static str, alias: &'static str, kind: ParamKind) -> Param {
    Param { name, alias, kind }
}

const TOKEN0: Param = param("token0", "token0", ParamKind::Symbol);
const TOKEN1: Param = param("token1", "token1", ParamKind::Symbol);
const FEE: Param = param("fee", "fee", ParamKind::Uint);
const AMOUNT0: Param = param("amount0", "amount0", ParamKind::Amount);
const AMOUNT1: Param = param("amount1", "amount1", ParamKind::Amount);
const SLIPPAGE: Param = param("slippage", "slippage", ParamKind::Uint);
const CHAIN_ID: Param = param("chainId", "chain_id", ParamKind::Uint);
const TOKEN_ID: Param = param("tokenId", "token_id", ParamKind::PositionId);
const PERCENT: Param = param("percent", "percent", ParamKind::Percent);

const CREATE_POSITION_PARAMS: &[Param] =
    &[TOKEN0, TOKEN1, FEE, AMOUNT0, AMOUNT1, SLIPPAGE, CHAIN_ID];
const ADD_LIQUIDITY_PARAMS: &[Param] = &[TOKEN_ID, AMOUNT0, AMOUNT1, SLIPPAGE, CHAIN_ID];
const REMOVE_LIQUIDITY_PARAMS: &[Param] = &[TOKEN_ID, PERCENT, SLIPPAGE, CHAIN_ID];
const COLLECT_FEES_PARAMS: &[Param] = &[TOKEN_ID, CHAIN_ID];
const CLOSE_POSITION_PARAMS: &[Param] = &[TOKEN_ID, SLIPPAGE, CHAIN_ID];

/// Canonical name of the chain id parameter, shared by every command.
pub const CHAIN_ID_PARAM: &str = "chainId";

impl Command {
    pub const ALL: [Command; 5] = [
        Command::CreatePosition,
        Command::AddLiquidity,
        Command::RemoveLiquidity,
        Command::CollectFees,
        Command::ClosePosition,
    ];

    /// Name used in inbound message payloads.
    pub fn name(self) -> &'static str {
        match self {
            Command::CreatePosition => "create-position",
            Command::AddLiquidity => "add-liquidity",
            Command::RemoveLiquidity => "remove-liquidity",
            Command::CollectFees => "collect-fees",
            Command::ClosePosition => "close-position",
        }
    }

    /// Internal name; the script lives at `<scripts-root>/<script_name>`.
    pub fn script_name(self) -> &'static str {
        match self {
            Command::CreatePosition => "create_position",
            Command::AddLiquidity => "add_liquidity",
            Command::RemoveLiquidity => "remove_liquidity",
            Command::CollectFees => "collect_fees",
            Command::ClosePosition => "close_position",
        }
    }

    /// Ordered parameter schema. Order matches the script's positional arguments.
    pub fn params(self) -> &'static [Param] {
        match self {
            Command::CreatePosition => CREATE_POSITION_PARAMS,
            Command::AddLiquidity => ADD_LIQUIDITY_PARAMS,
            Command::RemoveLiquidity => REMOVE_LIQUIDITY_PARAMS,
            Command::CollectFees => COLLECT_FEES_PARAMS,
            Command::ClosePosition => CLOSE_POSITION_PARAMS,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Command::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Command::from_name(s).ok_or_else(|| BridgeError::UnknownCommand(s.to_string()))
    }
}

/// A validated command invocation. Arguments are in schema order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    command: Command,
    args: Vec<(&'static str, String)>,
}

impl CommandRequest {
    /// Validate `args` against the command's schema.
    ///
    /// Every parameter must be supplied exactly once, under its canonical name
    /// or its snake_case alias. Unknown keys are rejected.
    pub fn from_args(command: Command, args: &Map<String, Value>) -> Result<Self> {
        let schema = command.params();

        if let Some(key) = args
            .keys()
            .find(|key| !schema.iter().any(|p| p.name == *key || p.alias == *key))
        {
            return Err(BridgeError::InvalidArguments(format!(
                "unexpected parameter '{key}' for {command}"
            )));
        }

        let mut missing = Vec::new();
        let mut normalized = Vec::with_capacity(schema.len());
        for param in schema {
            let canonical = args.get(param.name);
            let alias = if param.alias == param.name {
                None
            } else {
                args.get(param.alias)
            };

            let value = match (canonical, alias) {
                (Some(_), Some(_)) => {
                    return Err(BridgeError::InvalidArguments(format!(
                        "parameter '{}' given twice (as '{}' and '{}')",
                        param.name, param.name, param.alias
                    )));
                }
                (Some(value), None) | (None, Some(value)) => value,
                (None, None) => {
                    missing.push(param.name);
                    continue;
                }
            };

            normalized.push((param.name, normalize(param, value)?));
        }

        if !missing.is_empty() {
            return Err(BridgeError::InvalidArguments(format!(
                "missing parameters for {command}: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            command,
            args: normalized,
        })
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn args(&self) -> &[(&'static str, String)] {
        &self.args
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Positional string arguments handed to the script.
    pub fn positional(&self) -> Vec<String> {
        self.args.iter().map(|(_, value)| value.clone()).collect()
    }
}

fn normalize(param: &Param, value: &Value) -> Result<String> {
    let invalid = |expected: &str| {
        BridgeError::InvalidArguments(format!("{} must be {expected}", param.name))
    };

    match param.kind {
        ParamKind::Symbol => match value {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(invalid("a non-empty string")),
        },
        ParamKind::Uint => match value {
            Value::Number(n) => n
                .as_u64()
                .map(|n| n.to_string())
                .ok_or_else(|| invalid("an unsigned integer")),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(|n| n.to_string())
                .map_err(|_| invalid("an unsigned integer")),
            _ => Err(invalid("an unsigned integer")),
        },
        ParamKind::Amount | ParamKind::Percent => {
            let (text, number) = match value {
                Value::Number(n) => (n.to_string(), n.as_f64()),
                Value::String(s) => (s.trim().to_string(), s.trim().parse::<f64>().ok()),
                _ => (String::new(), None),
            };
            let in_range = |n: f64| {
                if param.kind == ParamKind::Percent {
                    n > 0.0 && n <= 100.0
                } else {
                    n >= 0.0
                }
            };
            match number {
                Some(n) if n.is_finite() && in_range(n) => Ok(text),
                _ if param.kind == ParamKind::Percent => Err(invalid("a number in (0, 100]")),
                _ => Err(invalid("a non-negative number")),
            }
        }
        ParamKind::PositionId => match value {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Value::Number(n) => n
                .as_u64()
                .map(|n| n.to_string())
                .ok_or_else(|| invalid("a position id")),
            _ => Err(invalid("a position id")),
        },
    }
}
