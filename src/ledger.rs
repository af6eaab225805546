//! Contract proxy client.
//!
//! Thin, stateless wrapper around the three ledger contract calls the gateway
//! forwards: `TokenStore.purchase`, `PlayGame.startMatch` and
//! `PlayGame.submitResult`. Each call is one outbound request with no retry
//! and no idempotency key; remote errors are surfaced verbatim.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;

/// Transaction hash returned by the ledger ("0x…")
pub type TxHash = String;

/// Token amount in the contract's base units (uint256 on chain)
pub type LedgerAmount = u128;

/// The ledger operations the gateway depends on
pub trait LedgerClient: Send + Sync + 'static {
    /// Buy game tokens for `buyer` with `usdt_amount` stable tokens
    fn purchase(&self, buyer: &str, usdt_amount: LedgerAmount) -> impl Future<Output = Result<TxHash>> + Send;

    /// Open an escrowed match between two players
    fn start_match(
        &self,
        match_id: &str,
        player1: &str,
        player2: &str,
        stake_amount: LedgerAmount,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Report the winner of a match, releasing escrow
    fn submit_result(&self, match_id: &str, winner: &str) -> impl Future<Output = Result<TxHash>> + Send;
}

/// Encode a short string as a right-padded `bytes32` hex literal.
/// At most 31 bytes, so the value stays null-terminated.
pub fn format_bytes32(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    if bytes.len() > 31 {
        bail!("bytes32 string must be less than 32 bytes");
    }
    let mut out = String::with_capacity(66);
    out.push_str("0x");
    for i in 0..32 {
        let b = bytes.get(i).copied().unwrap_or(0);
        out.push_str(&format!("{:02x}", b));
    }
    Ok(out)
}

// === JSON-RPC wire types ===

#[derive(Serialize, Debug)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: ContractCall<'a>,
}

#[derive(Serialize, Debug)]
struct ContractCall<'a> {
    to: &'a str,
    from: &'a str,
    function: &'static str,
    args: Vec<Value>,
}

#[derive(Deserialize, Debug)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Deserialize, Debug)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    /// The transaction hash, or the remote error message unchanged
    pub fn into_tx_hash(self) -> Result<TxHash> {
        if let Some(err) = self.error {
            debug!("[LEDGER] relay error code {}", err.code);
            return Err(anyhow!(err.message));
        }
        self.result.ok_or_else(|| anyhow!("ledger response carried no transaction hash"))
    }
}

// === Relay client ===

/// Ledger client speaking JSON-RPC 2.0 to a contract relay
/// (`method = "contract_call"`). The relay signs and submits the
/// transaction and answers with its hash.
pub struct RpcLedgerClient {
    http: reqwest::Client,
    rpc_url: String,
    token_store: String,
    play_game: String,
    signer: String,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.ledger_timeout)
            .build()
            .context("Failed to build ledger HTTP client")?;

        info!("[LEDGER] Relay {} | TokenStore={} | PlayGame={}",
              config.ledger_rpc_url, config.token_store_address, config.play_game_address);

        Ok(Self {
            http,
            rpc_url: config.ledger_rpc_url.clone(),
            token_store: config.token_store_address.clone(),
            play_game: config.play_game_address.clone(),
            signer: config.signer_address.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn contract_call(
        &self,
        to: &str,
        from: &str,
        function: &'static str,
        args: Vec<Value>,
    ) -> Result<TxHash> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "contract_call",
            params: ContractCall { to, from, function, args },
        };

        let resp = self.http.post(&self.rpc_url).json(&request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // Relays usually still answer with a JSON-RPC error body
            if let Ok(parsed) = serde_json::from_str::<RpcResponse>(&body) {
                if parsed.error.is_some() {
                    return parsed.into_tx_hash();
                }
            }
            warn!("[LEDGER] {} -> HTTP {}", function, status);
            if body.is_empty() {
                bail!("{}", status);
            }
            bail!("{}", body);
        }

        let parsed: RpcResponse = serde_json::from_str(&body)
            .with_context(|| format!("Malformed ledger response: {}", body.chars().take(200).collect::<String>()))?;
        let tx_hash = parsed.into_tx_hash()?;
        info!("[LEDGER] {} -> {}", function, tx_hash);
        Ok(tx_hash)
    }
}

impl LedgerClient for RpcLedgerClient {
    async fn purchase(&self, buyer: &str, usdt_amount: LedgerAmount) -> Result<TxHash> {
        let args = vec![json!(usdt_amount.to_string())];
        self.contract_call(&self.token_store, buyer, "purchase(uint256)", args).await
    }

    async fn start_match(
        &self,
        match_id: &str,
        player1: &str,
        player2: &str,
        stake_amount: LedgerAmount,
    ) -> Result<TxHash> {
        let args = vec![
            json!(format_bytes32(match_id)?),
            json!(player1),
            json!(player2),
            json!(stake_amount.to_string()),
        ];
        self.contract_call(&self.play_game, &self.signer, "startMatch(bytes32,address,address,uint256)", args)
            .await
    }

    async fn submit_result(&self, match_id: &str, winner: &str) -> Result<TxHash> {
        let args = vec![json!(format_bytes32(match_id)?), json!(winner)];
        self.contract_call(&self.play_game, &self.signer, "submitResult(bytes32,address)", args).await
    }
}
