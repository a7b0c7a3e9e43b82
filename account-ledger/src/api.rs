//! HTTP surface
//!
//! Thin axum adapter over [`Ledger`]. Status codes and bodies match the
//! existing clients: malformed requests get 400, ledger errors get 500, and
//! both carry the error message as a bare JSON string.

use crate::{
    types::{AccountId, AccountSnapshot, TransactionLogEntry},
    Error, Ledger,
};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Ledger core
    pub ledger: Arc<Ledger>,

    /// Cancelled when the server starts shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create new state
    pub fn new(ledger: Arc<Ledger>, shutdown: CancellationToken) -> Self {
        Self { ledger, shutdown }
    }
}

/// HTTP error
#[derive(Debug)]
pub enum ApiError {
    /// Body or path could not be parsed
    Malformed(String),
    /// Ledger rejected the operation
    Ledger(Error),
    /// Anything else
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Malformed(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Ledger(Error::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, Error::Cancelled.to_string())
            }
            ApiError::Ledger(e) => {
                if e.is_domain() {
                    tracing::debug!(error = ?e, "Request rejected by ledger");
                } else {
                    tracing::error!(error = ?e, "Ledger error");
                }
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(message)).into_response()
    }
}

/// JSON body extractor that reports parse failures as [`ApiError::Malformed`]
///
/// Does not insist on a JSON content type.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Malformed(e.body_text()))?;

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

/// Body of `POST /accounts` responses
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    /// New account
    #[serde(rename = "AccountID")]
    pub account_id: AccountId,
}

/// Body of deposit and withdraw requests
#[derive(Debug, Serialize, Deserialize)]
pub struct AmountRequest {
    /// Target account
    pub account_id: AccountId,
    /// Integer units
    pub amount: i64,
}

/// Body of transfer requests
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Debited account
    pub from_account_id: AccountId,
    /// Credited account
    pub to_account_id: AccountId,
    /// Integer units
    pub amount: i64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Number of accounts
    pub accounts: usize,
    /// Flushed log entries
    pub log_entries: usize,
    /// Log pipeline still accepting entries
    pub log_pipeline_running: bool,
}

const SUCCESS: &str = "success";

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/deposit", post(deposit))
        .route("/accounts/withdraw", post(withdraw))
        .route("/accounts/transfer", post(transfer))
        .route("/accounts/:id", get(get_account))
        .route("/transactions", get(get_transactions))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_account(
    State(state): State<AppState>,
) -> Result<Json<CreateAccountResponse>, ApiError> {
    let account_id = state.ledger.scoped(&state.shutdown).create_account()?;
    tracing::info!(%account_id, "create account");
    Ok(Json(CreateAccountResponse { account_id }))
}

async fn deposit(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AmountRequest>,
) -> Result<Json<&'static str>, ApiError> {
    state
        .ledger
        .scoped(&state.shutdown)
        .deposit(req.account_id, req.amount)?;
    tracing::info!(account_id = %req.account_id, amount = req.amount, "deposit account");
    Ok(Json(SUCCESS))
}

async fn withdraw(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AmountRequest>,
) -> Result<Json<&'static str>, ApiError> {
    state
        .ledger
        .scoped(&state.shutdown)
        .withdraw(req.account_id, req.amount)?;
    tracing::info!(account_id = %req.account_id, amount = req.amount, "withdraw account");
    Ok(Json(SUCCESS))
}

async fn transfer(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TransferRequest>,
) -> Result<Json<&'static str>, ApiError> {
    state
        .ledger
        .scoped(&state.shutdown)
        .transfer(req.from_account_id, req.to_account_id, req.amount)
        .await?;
    tracing::info!(
        from = %req.from_account_id,
        to = %req.to_account_id,
        amount = req.amount,
        "transfer"
    );
    Ok(Json(SUCCESS))
}

async fn get_account(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<AccountSnapshot>, ApiError> {
    let id: u64 = raw_id
        .parse()
        .map_err(|_| ApiError::Malformed(format!("invalid account id: {}", raw_id)))?;

    let snapshot = state
        .ledger
        .scoped(&state.shutdown)
        .get_account(AccountId::new(id))?;
    tracing::info!(account_id = id, "get account");
    Ok(Json(snapshot))
}

async fn get_transactions(State(state): State<AppState>) -> Json<Vec<TransactionLogEntry>> {
    Json(state.ledger.transactions())
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.ledger.config();
    let running = state.ledger.log_pipeline_running();

    Json(HealthResponse {
        status: if running { "healthy" } else { "degraded" }.to_string(),
        service: config.service_name.clone(),
        version: config.service_version.clone(),
        accounts: state.ledger.accounts().len(),
        log_entries: state.ledger.transactions().len(),
        log_pipeline_running: running,
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .ledger
        .metrics()
        .export()
        .map_err(|e| ApiError::Internal(format!("Failed to export metrics: {}", e)))
}
