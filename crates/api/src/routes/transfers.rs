//! Transfer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{AccountId, TransactionId};
use domain::{Money, PixKey, Transfer};
use ledger::{InMemoryDirectory, Ledger, TransferStore};
use saga::{SimulatedAuthority, TimedValidator, TransferOrchestrator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Settlement validator used by the default wiring: the simulated
/// authority behind a bounded timeout.
pub type DefaultValidator = TimedValidator<SimulatedAuthority>;

/// Shared application state accessible from all handlers.
pub struct AppState<L, T>
where
    L: Ledger + Clone + Send + Sync + 'static,
    T: TransferStore + Clone + Send + Sync + 'static,
{
    pub orchestrator: TransferOrchestrator<L, InMemoryDirectory, DefaultValidator, T>,
    pub ledger: L,
    pub directory: InMemoryDirectory,
    pub transfers: T,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTransferRequest {
    pub origin_account_id: String,
    pub destination_key: String,
    pub amount_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransferResponse {
    pub id: String,
    pub origin_account_id: String,
    pub destination_account_id: Option<String>,
    pub destination_key: String,
    pub amount_cents: i64,
    pub status: String,
    pub receiver_name: Option<String>,
    pub receiver_bank: Option<String>,
    pub needs_compensation: bool,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl From<&Transfer> for TransferResponse {
    fn from(transfer: &Transfer) -> Self {
        Self {
            id: transfer.id.to_string(),
            origin_account_id: transfer.origin_account.to_string(),
            destination_account_id: transfer.destination_account.map(|id| id.to_string()),
            destination_key: transfer.destination_key.masked(),
            amount_cents: transfer.amount.cents(),
            status: transfer.status.to_string(),
            receiver_name: transfer.details.as_ref().map(|d| d.receiver_name.clone()),
            receiver_bank: transfer.details.as_ref().map(|d| d.receiver_bank.clone()),
            needs_compensation: transfer.needs_compensation,
            started_at: transfer.started_at.to_rfc3339(),
            completed_at: transfer.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

// -- Handlers --

/// POST /transfers — execute a transfer saga.
#[tracing::instrument(skip(state, req))]
pub async fn create<L, T>(
    State(state): State<Arc<AppState<L, T>>>,
    Json(req): Json<CreateTransferRequest>,
) -> Result<(axum::http::StatusCode, Json<TransferResponse>), ApiError>
where
    L: Ledger + Clone + Send + Sync + 'static,
    T: TransferStore + Clone + Send + Sync + 'static,
{
    let origin = parse_account_id(&req.origin_account_id)?;
    let amount = Money::from_cents(req.amount_cents);

    let transfer = state
        .orchestrator
        .execute_transfer(origin, PixKey::new(req.destination_key), amount)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(TransferResponse::from(&transfer)),
    ))
}

/// GET /transfers/{id} — load a persisted transfer by ID.
#[tracing::instrument(skip(state))]
pub async fn get<L, T>(
    State(state): State<Arc<AppState<L, T>>>,
    Path(id): Path<String>,
) -> Result<Json<TransferResponse>, ApiError>
where
    L: Ledger + Clone + Send + Sync + 'static,
    T: TransferStore + Clone + Send + Sync + 'static,
{
    let transaction_id = parse_transaction_id(&id)?;

    let transfer = state
        .transfers
        .get(transaction_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("Transfer {id} not found")))?;

    Ok(Json(TransferResponse::from(&transfer)))
}

fn parse_account_id(id: &str) -> Result<AccountId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid origin_account_id: {e}")))?;
    Ok(AccountId::from_uuid(uuid))
}

fn parse_transaction_id(id: &str) -> Result<TransactionId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(TransactionId::from_uuid(uuid))
}
