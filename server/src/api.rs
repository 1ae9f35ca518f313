//! # REST API
//!
//! Builds the axum router that exposes the ledger's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path           | Description                            |
//! |--------|----------------|----------------------------------------|
//! | GET    | `/health`      | Liveness probe                         |
//! | POST   | `/wallets`     | Create a wallet (reveals the PIN once) |
//! | POST   | `/mint`        | Teacher-only coin credit               |
//! | POST   | `/transfer`    | PIN-authorized peer-to-peer transfer   |
//! | GET    | `/balances`    | All wallets, richest first             |
//! | GET    | `/leaderboard` | Top 10 wallets                         |
//! | GET    | `/ledger`      | Recent ledger rows, newest first       |
//!
//! ## Error Mapping
//!
//! The library's error taxonomy maps onto status codes: validation and
//! insufficient-funds failures are 400, authorization failures are 403,
//! unknown addresses are 404. Storage faults surface as 500 with a
//! generic body — internal detail stays in the logs.

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use educoin_ledger::config::MINT_DEFAULT_AMOUNT;
use educoin_ledger::error::LedgerError;
use educoin_ledger::model::Wallet;
use educoin_ledger::ops::{BalanceRow, LedgerRow, LedgerService, MintReceipt, TransferReceipt};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — the service and metrics are both `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    /// The shared operations layer.
    pub service: LedgerService,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Wraps an operation failure for the HTTP layer, counting client
    /// rejections along the way.
    fn reject(&self, err: LedgerError) -> ApiError {
        if matches!(
            err,
            LedgerError::Validation(_)
                | LedgerError::Unauthorized(_)
                | LedgerError::NotFound(_)
                | LedgerError::InsufficientFunds { .. }
        ) {
            self.metrics.rejected_operations_total.inc();
        }
        ApiError(err)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/wallets", post(create_wallet_handler))
        .route("/mint", post(mint_handler))
        .route("/transfer", post(transfer_handler))
        .route("/balances", get(balances_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/ledger", get(ledger_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Request body for `POST /wallets`.
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    /// Display name for the new wallet.
    pub name: Option<String>,
}

/// Request body for `POST /mint`.
///
/// Amounts arrive as signed integers so that a negative value is rejected
/// with a proper validation error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct MintRequest {
    /// The teacher secret authorizing the mint.
    #[serde(default)]
    pub teacher_secret: String,
    /// Recipient address.
    #[serde(default)]
    pub to: String,
    /// Coins to mint. Defaults to 1.
    pub amount: Option<i64>,
    /// Optional free-text note.
    pub note: Option<String>,
}

/// Request body for `POST /transfer`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Sender address.
    #[serde(default)]
    pub from: String,
    /// Recipient address.
    #[serde(default)]
    pub to: String,
    /// Coins to move. Must be positive.
    pub amount: Option<i64>,
    /// The sender's PIN.
    #[serde(default)]
    pub pin: String,
    /// Optional free-text note.
    pub note: Option<String>,
}

/// Query parameters for `GET /ledger`.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// Maximum rows to return. Defaulted and clamped by the ops layer.
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `POST /wallets`. The only response that ever
/// carries a PIN.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWalletResponse {
    /// The freshly created wallet record, PIN included.
    pub wallet: Wallet,
}

/// Response payload for `GET /balances`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub balances: Vec<BalanceRow>,
}

/// Response payload for `GET /leaderboard`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<BalanceRow>,
}

/// Response payload for `GET /ledger`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerResponse {
    pub ledger: Vec<LedgerRow>,
}

/// Generic error body returned by all endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Adapter from [`LedgerError`] to an HTTP response.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::Validation(_)
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::BalanceOverflow { .. } => StatusCode::BAD_REQUEST,
            LedgerError::Unauthorized(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::AddressTaken { .. }
            | LedgerError::Storage(_)
            | LedgerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error serving request: {}", self.0);
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Folds a signed request amount into the unsigned domain. Negative
/// values become 0, which the ops layer rejects as a validation error
/// in its own checking order.
fn clamp_amount(amount: i64) -> u64 {
    u64::try_from(amount).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the server is alive.
///
/// This is the liveness probe for orchestrators. It intentionally does
/// not touch the store.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /wallets` — creates a wallet and reveals its PIN, once.
async fn create_wallet_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.unwrap_or_default();
    let wallet = state
        .service
        .create_wallet(&name)
        .map_err(|e| state.reject(e))?;

    state.metrics.wallets_created_total.inc();
    state
        .metrics
        .wallet_count
        .set(state.service.db().wallet_count() as i64);

    Ok((StatusCode::CREATED, Json(CreateWalletResponse { wallet })))
}

/// `POST /mint` — teacher-only coin credit.
async fn mint_handler(
    State(state): State<AppState>,
    Json(req): Json<MintRequest>,
) -> Result<Json<MintReceipt>, ApiError> {
    let amount = match req.amount {
        Some(amount) => clamp_amount(amount),
        None => MINT_DEFAULT_AMOUNT,
    };
    let receipt = state
        .service
        .mint(&req.teacher_secret, &req.to, amount, req.note)
        .map_err(|e| state.reject(e))?;

    state.metrics.mints_total.inc();
    Ok(Json(receipt))
}

/// `POST /transfer` — PIN-authorized peer-to-peer coin movement.
async fn transfer_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferReceipt>, ApiError> {
    let amount = clamp_amount(req.amount.unwrap_or(0));
    let receipt = state
        .service
        .transfer(&req.from, &req.to, &req.pin, amount, req.note)
        .map_err(|e| state.reject(e))?;

    state.metrics.transfers_total.inc();
    Ok(Json(receipt))
}

/// `GET /balances` — every wallet, richest first.
async fn balances_handler(
    State(state): State<AppState>,
) -> Result<Json<BalancesResponse>, ApiError> {
    let balances = state.service.balances()?;
    // Every wallet has a row in this view, so the listing doubles as a
    // gauge refresh — it catches wallets created outside the HTTP surface.
    state.metrics.wallet_count.set(balances.len() as i64);
    Ok(Json(BalancesResponse { balances }))
}

/// `GET /leaderboard` — the top 10 wallets by balance.
async fn leaderboard_handler(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let leaderboard = state.service.leaderboard()?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// `GET /ledger` — recent ledger rows, newest first.
async fn ledger_handler(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerResponse>, ApiError> {
    let ledger = state.service.ledger(query.limit)?;
    Ok(Json(LedgerResponse { ledger }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
