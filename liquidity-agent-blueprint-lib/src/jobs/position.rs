use serde_json::{Map, Value, json};

use crate::command::Command;
use crate::registry::CommandRegistry;
use crate::tangle::extract::{Caller, TangleArg, TangleResult};
use crate::util::args_map;
use crate::{
    AddLiquidityRequest, ClosePositionRequest, CollectFeesRequest, CreatePositionRequest,
    JsonResponse, RemoveLiquidityRequest, agent,
};

// ---------------------------------------------------------------------------
// Argument builders (ABI request → command args)
// ---------------------------------------------------------------------------

pub fn create_position_args(request: &CreatePositionRequest) -> Map<String, Value> {
    args_map([
        ("token0", json!(request.token0)),
        ("token1", json!(request.token1)),
        ("fee", json!(request.fee)),
        ("amount0", json!(request.amount0)),
        ("amount1", json!(request.amount1)),
        ("slippage", json!(request.slippage)),
        ("chainId", json!(request.chain_id)),
    ])
}

pub fn add_liquidity_args(request: &AddLiquidityRequest) -> Map<String, Value> {
    args_map([
        ("tokenId", json!(request.token_id)),
        ("amount0", json!(request.amount0)),
        ("amount1", json!(request.amount1)),
        ("slippage", json!(request.slippage)),
        ("chainId", json!(request.chain_id)),
    ])
}

pub fn remove_liquidity_args(request: &RemoveLiquidityRequest) -> Map<String, Value> {
    args_map([
        ("tokenId", json!(request.token_id)),
        ("percent", json!(request.percent)),
        ("slippage", json!(request.slippage)),
        ("chainId", json!(request.chain_id)),
    ])
}

pub fn collect_fees_args(request: &CollectFeesRequest) -> Map<String, Value> {
    args_map([
        ("tokenId", json!(request.token_id)),
        ("chainId", json!(request.chain_id)),
    ])
}

pub fn close_position_args(request: &ClosePositionRequest) -> Map<String, Value> {
    args_map([
        ("tokenId", json!(request.token_id)),
        ("slippage", json!(request.slippage)),
        ("chainId", json!(request.chain_id)),
    ])
}

/// Dispatch a typed job through the registry. Failed commands are still a
/// successful job: the caller gets the structured failure body.
pub async fn run_command(
    registry: &CommandRegistry,
    command: Command,
    args: Map<String, Value>,
) -> JsonResponse {
    let result = registry.dispatch(command.name(), &args).await;
    JsonResponse {
        json: result.to_json(),
    }
}

// ---------------------------------------------------------------------------
// Job handlers
// ---------------------------------------------------------------------------

pub async fn create_position(
    Caller(_caller): Caller,
    TangleArg(request): TangleArg<CreatePositionRequest>,
) -> Result<TangleResult<JsonResponse>, String> {
    let args = create_position_args(&request);
    let response = run_command(&agent()?.registry, Command::CreatePosition, args).await;
    Ok(TangleResult(response))
}

pub async fn add_liquidity(
    Caller(_caller): Caller,
    TangleArg(request): TangleArg<AddLiquidityRequest>,
) -> Result<TangleResult<JsonResponse>, String> {
    let args = add_liquidity_args(&request);
    let response = run_command(&agent()?.registry, Command::AddLiquidity, args).await;
    Ok(TangleResult(response))
}

pub async fn remove_liquidity(
    Caller(_caller): Caller,
    TangleArg(request): TangleArg<RemoveLiquidityRequest>,
) -> Result<TangleResult<JsonResponse>, String> {
    let args = remove_liquidity_args(&request);
    let response = run_command(&agent()?.registry, Command::RemoveLiquidity, args).await;
    Ok(TangleResult(response))
}

pub async fn collect_fees(
    Caller(_caller): Caller,
    TangleArg(request): TangleArg<CollectFeesRequest>,
) -> Result<TangleResult<JsonResponse>, String> {
    let args = collect_fees_args(&request);
    let response = run_command(&agent()?.registry, Command::CollectFees, args).await;
    Ok(TangleResult(response))
}

pub async fn close_position(
    Caller(_caller): Caller,
    TangleArg(request): TangleArg<ClosePositionRequest>,
) -> Result<TangleResult<JsonResponse>, String> {
    let args = close_position_args(&request);
    let response = run_command(&agent()?.registry, Command::ClosePosition, args).await;
    Ok(TangleResult(response))
}
