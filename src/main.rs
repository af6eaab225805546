//! TriX arena gateway
//!
//! Runs the HTTP gateway that forwards token purchases and match
//! start/result calls to the ledger contracts, next to the in-process arena
//! engine that tracks match lifecycle, escrow and winnings.
//!
//! ## Environment
//!
//! - `GATEWAY_LISTEN_ADDR` bind address (default `0.0.0.0:3000`)
//! - `LEDGER_RPC_URL`, `TOKEN_STORE_ADDRESS`, `PLAY_GAME_ADDRESS`,
//!   `GATEWAY_SIGNER_ADDRESS` ledger relay and contract addresses
//! - `DEMO_DATA=1` seed the arena with demo matches
//! - `SIMULATE_MATCHES=1` resolve Active matches with the random simulator

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use trix_gateway::config::{
    demo_data_enabled, simulate_matches_enabled, GatewayConfig, HEARTBEAT_SECS, SIMULATION_TICK_SECS,
};
use trix_gateway::engine::{run_event_logger, spawn_arena};
use trix_gateway::gateway;
use trix_gateway::ledger::RpcLedgerClient;
use trix_gateway::lifecycle::{Arena, Session};
use trix_gateway::simulation::{run_simulation_loop, MatchSimulator};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with both stdout and file output
    let file_appender = tracing_appender::rolling::never(".", "gateway.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("trix_gateway=info".parse().context("invalid log directive")?);

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    dotenvy::dotenv().ok();

    info!("🎮 TriX arena gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::from_env()?;
    let ledger = Arc::new(RpcLedgerClient::new(&config)?);

    // Arena engine
    let mut arena = Arena::new();
    if demo_data_enabled() {
        arena.seed_demo(Utc::now()).context("Failed to seed demo arena")?;
        info!("   Demo data: {} matches seeded", arena.active_matches(None).len());
    }
    let (arena_handle, arena_task) = spawn_arena(arena);
    tokio::spawn(run_event_logger(arena_handle.subscribe()));

    if simulate_matches_enabled() {
        warn!("   Mode: SIMULATED match outcomes (SIMULATE_MATCHES=1)");
        let seed = Utc::now().timestamp() as u64;
        tokio::spawn(run_simulation_loop(
            arena_handle.clone(),
            MatchSimulator::new(seed),
            Duration::from_secs(SIMULATION_TICK_SECS),
        ));
    } else {
        info!("   Mode: outcomes via resolve_match only");
    }

    // Arena heartbeat
    let heartbeat_arena = arena_handle.clone();
    let heartbeat_handle = tokio::spawn(async move {
        let observer = Session::disconnected();
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_SECS));
        loop {
            interval.tick().await;
            match heartbeat_arena.snapshot(&observer, None).await {
                Ok(snap) => {
                    let live = snap.active_matches.iter().filter(|m| m.is_open()).count();
                    info!("💓 Arena heartbeat | {} matches in active set, {} open",
                          snap.active_matches.len(), live);
                }
                Err(e) => {
                    error!("[ARENA] Heartbeat failed: {}", e);
                    break;
                }
            }
        }
    });

    // HTTP gateway
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    let gateway_handle = tokio::spawn(gateway::serve(listener, ledger));

    info!("✅ All systems operational");
    match gateway_handle.await {
        Ok(Err(e)) => error!("[GATEWAY] Server stopped: {}", e),
        Err(e) => error!("[GATEWAY] Server task panicked: {}", e),
        Ok(Ok(())) => {}
    }

    heartbeat_handle.abort();
    arena_task.abort();
    Ok(())
}
