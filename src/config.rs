//! System configuration.
//!
//! Arena constants, gateway settings, and environment variable parsing.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Minimum length of a caller-supplied match id
pub const MIN_MATCH_ID_LEN: usize = 3;

/// How long a Completed match stays in the active set (seconds)
pub const RETENTION_SECS: i64 = 60;

/// Per-tick probability that an Active match completes in simulation
pub const COMPLETE_PROBABILITY: f64 = 0.3;

/// Simulator tick interval (seconds)
pub const SIMULATION_TICK_SECS: u64 = 30;

/// Arena heartbeat log interval (seconds)
pub const HEARTBEAT_SECS: u64 = 60;

/// Arena command queue capacity
pub const ARENA_QUEUE_CAPACITY: usize = 256;

/// Arena event broadcast capacity
pub const ARENA_EVENT_CAPACITY: usize = 1024;

/// Default gateway bind address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Default ledger relay endpoint (local dev node)
pub const DEFAULT_LEDGER_RPC_URL: &str = "http://127.0.0.1:8545";

/// Default timeout for a single ledger call (seconds)
pub const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 30;

/// Gateway and ledger settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP gateway binds to
    pub listen_addr: SocketAddr,

    /// Ledger relay JSON-RPC endpoint
    pub ledger_rpc_url: String,

    /// TokenStore contract address (purchase)
    pub token_store_address: String,

    /// PlayGame contract address (startMatch, submitResult)
    pub play_game_address: String,

    /// Account the gateway signs as (holds the gateway role on PlayGame)
    pub signer_address: String,

    /// Timeout applied to each ledger call
    pub ledger_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("GATEWAY_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .context("GATEWAY_LISTEN_ADDR is not a socket address")?;

        Ok(Self {
            listen_addr,

            ledger_rpc_url: std::env::var("LEDGER_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_LEDGER_RPC_URL.to_string()),

            token_store_address: std::env::var("TOKEN_STORE_ADDRESS")
                .context("TOKEN_STORE_ADDRESS not set")?,

            play_game_address: std::env::var("PLAY_GAME_ADDRESS")
                .context("PLAY_GAME_ADDRESS not set")?,

            signer_address: std::env::var("GATEWAY_SIGNER_ADDRESS")
                .context("GATEWAY_SIGNER_ADDRESS not set")?,

            ledger_timeout: Duration::from_secs(
                std::env::var("LEDGER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_LEDGER_TIMEOUT_SECS),
            ),
        })
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Run the simulated match resolver (set SIMULATE_MATCHES=1 to enable).
/// Outcomes are random; never enable against real stakes.
pub fn simulate_matches_enabled() -> bool {
    static CACHED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *CACHED.get_or_init(|| env_flag("SIMULATE_MATCHES"))
}

/// Seed the arena with demo matches on startup (set DEMO_DATA=1 to enable)
pub fn demo_data_enabled() -> bool {
    static CACHED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *CACHED.get_or_init(|| env_flag("DEMO_DATA"))
}
