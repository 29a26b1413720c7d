//! HTTP API for a forgechain node
//!
//! Exposes mining, transaction submission and chain retrieval over JSON,
//! plus a few read-only endpoints for monitoring.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Number, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, Ledger, SharedLedger};
use crate::config::Config;
use crate::error::ChainError;
use crate::miner::{Miner, ProofOfWork};
use crate::transaction::Transaction;

const REQUIRED_FIELDS: [&str; 3] = ["sender", "recipient", "amount"];

/// State shared by every handler.
#[derive(Clone)]
pub struct Node {
    pub ledger: SharedLedger,
    pub miner: Miner,
    blocks_mined: Arc<AtomicU64>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl Node {
    pub fn new(ledger: SharedLedger, miner: Miner) -> Self {
        Self {
            ledger,
            miner,
            blocks_mined: Arc::new(AtomicU64::new(0)),
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    /// Fresh ledger, with the miner configured from `config` and paying
    /// rewards to `node_identifier`.
    pub fn from_config(config: &Config, node_identifier: impl Into<String>) -> Self {
        let miner = Miner::new(ProofOfWork::new(config.miner.difficulty), node_identifier)
            .with_reward(config.miner.reward);
        Self::new(SharedLedger::new(Ledger::new()), miner)
    }

    pub fn node_identifier(&self) -> &str {
        self.miner.address()
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    /// Run the mining protocol once.
    pub async fn mine(&self) -> Result<Block, ApiError> {
        let block = self.miner.mine(&self.ledger).await?;
        self.blocks_mined.fetch_add(1, Ordering::SeqCst);
        Ok(block)
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            blocks_mined: self.blocks_mined(),
            chain_length: self.ledger.height(),
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InternalError(msg) => ApiError::InternalError(msg),
            other => ApiError::BlockchainError(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub blocks_mined: u64,
    pub chain_length: u64,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Pull a transaction out of a submitted JSON body.
///
/// Absent (or null) fields are reported together as missing values before
/// any type checks run.
fn parse_transaction(values: &Value) -> Result<Transaction, ApiError> {
    let missing = REQUIRED_FIELDS
        .iter()
        .any(|field| values.get(field).map_or(true, Value::is_null));
    if missing {
        return Err(ApiError::InvalidInput("Missing values".to_string()));
    }

    let text_field = |field: &str| -> Result<String, ApiError> {
        match &values[field] {
            Value::String(s) => Ok(s.clone()),
            other => Err(ApiError::InvalidInput(format!(
                "Field '{}' must be a string, got {}",
                field, other
            ))),
        }
    };
    let amount: Number = match &values["amount"] {
        Value::Number(n) => n.clone(),
        other => {
            return Err(ApiError::InvalidInput(format!(
                "Field 'amount' must be a number, got {}",
                other
            )))
        }
    };

    Ok(Transaction::new(text_field("sender")?, text_field("recipient")?, amount))
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route("/chain", get(full_chain))
        .route("/chain/validate", get(validate_chain))
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn run_api_server(node: Arc<Node>, addr: SocketAddr) -> crate::error::Result<()> {
    let app = build_api_router(node.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, node_id = %node.node_identifier(), "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;

    Ok(Json(MineResponse {
        message: "New Block Forged".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

/// The body is parsed as JSON whatever its declared content type.
async fn new_transaction(
    State(node): State<Arc<Node>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let values: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid JSON body: {}", e)))?;
    let tx = parse_transaction(&values)?;

    let index = node.ledger.add_transaction(tx).await;

    {
        let mut stats = node.api_stats.write().await;
        stats.transactions_submitted += 1;
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Transaction will be added to Block {}", index),
        }),
    ))
}

async fn pending_transactions(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let transactions = node.ledger.pending().await;
    Json(serde_json::json!({
        "count": transactions.len(),
        "transactions": transactions
    }))
}

async fn full_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    let ledger = node.ledger.read().await;
    Json(ChainResponse {
        chain: ledger.full_chain(),
        length: ledger.len(),
    })
}

async fn validate_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let ledger = node.ledger.read().await;
    match ledger.validate(node.miner.pow()) {
        Ok(()) => Json(serde_json::json!({
            "valid": true,
            "length": ledger.len()
        })),
        Err(e) => Json(serde_json::json!({
            "valid": false,
            "length": ledger.len(),
            "error": e.to_string()
        })),
    }
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "node_id": node.node_identifier(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}
