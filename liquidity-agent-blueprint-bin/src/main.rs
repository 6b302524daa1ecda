//! Blueprint runner for liquidity-agent-blueprint.

use blueprint_sdk::contexts::tangle::TangleClientContext;
use blueprint_sdk::runner::BlueprintRunner;
use blueprint_sdk::runner::config::BlueprintEnvironment;
use blueprint_sdk::runner::tangle::config::TangleConfig;
use blueprint_sdk::tangle::{TangleConsumer, TangleProducer};
use blueprint_sdk::{error, info, warn};
use liquidity_agent_blueprint_lib::{AgentConfig, AgentContext, Autostake, init_agent, router};

#[tokio::main]
#[allow(clippy::result_large_err)]
async fn main() -> Result<(), blueprint_sdk::Error> {
    // Chain context, scripts root and autostake settings, resolved once.
    // A failure here surfaces through main's returned error; logging is not up yet.
    let config = AgentConfig::load()
        .map_err(|e| blueprint_sdk::Error::Other(format!("Invalid configuration: {e}")))?;
    setup_log(config.debug);

    info!(
        "Liquidity agent on {} (chain id {}), autostake {}",
        config.chain.target_chain,
        config.chain.chain_id,
        if config.autostake.enabled { "enabled" } else { "disabled" }
    );
    if config.chain.rpc_url.is_empty() {
        warn!(
            "{}_RPC_URL is not set; scripts will run without an RPC endpoint",
            config.chain.target_chain
        );
    }
    if !config.bridge.scripts_dir.is_dir() {
        warn!(
            "Scripts directory {} does not exist",
            config.bridge.scripts_dir.display()
        );
    }

    let ctx = AgentContext::from_config(&config);
    let registry = ctx.registry.clone();
    init_agent(ctx).map_err(blueprint_sdk::Error::Other)?;

    // Spawn the autostake scheduler. It ticks forever; disabled ticks are no-ops.
    {
        let autostake = Autostake::new(config.autostake.clone(), &config.chain, registry);
        tokio::spawn(autostake.run());
    }

    let env = BlueprintEnvironment::load()?;

    // Connect to the Tangle network
    let tangle_client = env
        .tangle_client()
        .await
        .map_err(|e| blueprint_sdk::Error::Other(e.to_string()))?;

    // Get service ID from protocol settings
    let service_id = env
        .protocol_settings
        .tangle()
        .map_err(|e| blueprint_sdk::Error::Other(e.to_string()))?
        .service_id
        .ok_or_else(|| blueprint_sdk::Error::Other("SERVICE_ID missing".into()))?;

    info!("Starting liquidity-agent-blueprint for service {service_id}");

    // Create producer (listens for JobSubmitted events) and consumer (submits results)
    let tangle_producer = TangleProducer::new(tangle_client.clone(), service_id);
    let tangle_consumer = TangleConsumer::new(tangle_client);

    let result = BlueprintRunner::builder(TangleConfig::default(), env)
        .router(router())
        .producer(tangle_producer)
        .consumer(tangle_consumer)
        .with_shutdown_handler(async move {
            info!("Shutting down liquidity-agent-blueprint");
            info!(
                "Final metrics: {:?}",
                liquidity_agent_blueprint_lib::metrics::metrics().snapshot()
            );
        })
        .run()
        .await;

    if let Err(e) = result {
        error!("Runner failed: {e:?}");
    }

    Ok(())
}

/// `RUST_LOG` wins when set; otherwise `DEBUG` selects debug over info.
fn setup_log(debug: bool) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_err()
    {}
}
