//! Autonomous memecoin agent
//!
//! Bootstraps the capability registry, tool catalog, engine transport
//! and dispatch loop, then runs until interrupted. Any construction
//! failure aborts startup; once the loop runs, faults only cost turns.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{
    Capability, CapabilityRegistry, DispatchLoop, RateLimitedChannel, ToolCatalog,
};
use agent_runtime::GeminiEngine;
use crypto_capabilities::{
    CoingeckoCapability, FearGreedCapability, LedgerCapability, RedditCapability,
    TwitterCapability, MEMEPOOL_PROMPT,
};

/// Minimum seconds between two consecutive engine sends.
const DEFAULT_SEND_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Construct every capability provider. Fail-fast: the agent does
    // not start with a partially-initialized capability set.
    let providers: Vec<Arc<dyn Capability>> = vec![
        Arc::new(CoingeckoCapability::from_env()?),
        Arc::new(FearGreedCapability::new()?),
        Arc::new(RedditCapability::from_env()?),
        Arc::new(TwitterCapability::from_env()?),
        Arc::new(LedgerCapability::from_env()?),
    ];

    let registry = CapabilityRegistry::load(providers)?;
    let catalog = ToolCatalog::build(&registry)?;

    tracing::info!("Advertising {} operations:", catalog.len());
    for name in catalog.names() {
        tracing::info!("  • {name}");
    }

    // Engine transport gets the catalog read-only, once.
    let engine = Arc::new(GeminiEngine::from_env(catalog.specs())?);

    let interval = std::env::var("AGENT_SEND_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SEND_INTERVAL_SECS);
    let channel = RateLimitedChannel::new(engine, Duration::from_secs(interval));

    // Cooperative shutdown: the loop observes the token between
    // iterations; an in-flight turn finishes first.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let agent = DispatchLoop::new(registry, catalog, channel, MEMEPOOL_PROMPT, cancel);
    agent.run().await?;

    Ok(())
}
