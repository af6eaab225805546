//! HTTP gateway.
//!
//! Three pass-through endpoints that map a JSON body onto one
//! [`LedgerClient`] call. Any failure, including a body that cannot be read,
//! becomes `500 { "error": <message> }` with the underlying message unchanged.
//! No authentication and no rate limiting.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::ledger::{LedgerAmount, LedgerClient, TxHash};

// === Request / response bodies ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub buyer: String,
    #[serde(deserialize_with = "ledger_amount")]
    pub usdt_amount: LedgerAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMatchRequest {
    pub match_id: String,
    pub player1: String,
    pub player2: String,
    #[serde(deserialize_with = "ledger_amount")]
    pub stake_amount: LedgerAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultRequest {
    pub match_id: String,
    pub winner: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub tx_hash: TxHash,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// uint256 amounts arrive either as a JSON integer or a decimal string
fn ledger_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LedgerAmount, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n as LedgerAmount),
        Raw::Text(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid BigNumber string {:?}", s))
        }),
    }
}

/// Failure of a gateway call; always rendered as a 500
#[derive(Debug)]
pub struct GatewayError(pub String);

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: self.0 })).into_response()
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError(rejection.body_text())
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        GatewayError(err.to_string())
    }
}

type GatewayResult = std::result::Result<Json<TxResponse>, GatewayError>;

// === Handlers ===

async fn purchase<L: LedgerClient>(
    State(ledger): State<Arc<L>>,
    body: std::result::Result<Json<PurchaseRequest>, JsonRejection>,
) -> GatewayResult {
    let Json(req) = body.map_err(|e| log_failure("/purchase", e.into()))?;
    info!("[GATEWAY] /purchase buyer={} usdt={}", req.buyer, req.usdt_amount);

    let tx_hash = ledger
        .purchase(&req.buyer, req.usdt_amount)
        .await
        .map_err(|e| log_failure("/purchase", e.into()))?;
    Ok(Json(TxResponse { tx_hash }))
}

async fn start_match<L: LedgerClient>(
    State(ledger): State<Arc<L>>,
    body: std::result::Result<Json<StartMatchRequest>, JsonRejection>,
) -> GatewayResult {
    let Json(req) = body.map_err(|e| log_failure("/match/start", e.into()))?;
    info!("[GATEWAY] /match/start id={} p1={} p2={} stake={}",
          req.match_id, req.player1, req.player2, req.stake_amount);

    let tx_hash = ledger
        .start_match(&req.match_id, &req.player1, &req.player2, req.stake_amount)
        .await
        .map_err(|e| log_failure("/match/start", e.into()))?;
    Ok(Json(TxResponse { tx_hash }))
}

async fn submit_result<L: LedgerClient>(
    State(ledger): State<Arc<L>>,
    body: std::result::Result<Json<SubmitResultRequest>, JsonRejection>,
) -> GatewayResult {
    let Json(req) = body.map_err(|e| log_failure("/match/result", e.into()))?;
    info!("[GATEWAY] /match/result id={} winner={}", req.match_id, req.winner);

    let tx_hash = ledger
        .submit_result(&req.match_id, &req.winner)
        .await
        .map_err(|e| log_failure("/match/result", e.into()))?;
    Ok(Json(TxResponse { tx_hash }))
}

fn log_failure(route: &str, err: GatewayError) -> GatewayError {
    error!("[GATEWAY] {} failed: {}", route, err.0);
    err
}

// === Server ===

/// Build the gateway router over a ledger client
pub fn router<L: LedgerClient>(ledger: Arc<L>) -> Router {
    Router::new()
        .route("/purchase", post(purchase::<L>))
        .route("/match/start", post(start_match::<L>))
        .route("/match/result", post(submit_result::<L>))
        .with_state(ledger)
}

/// Serve the gateway on an already-bound listener until the task is dropped
pub async fn serve<L: LedgerClient>(listener: TcpListener, ledger: Arc<L>) -> Result<()> {
    info!("[GATEWAY] API gateway listening on {}", listener.local_addr()?);
    axum::serve(listener, router(ledger)).await?;
    Ok(())
}
