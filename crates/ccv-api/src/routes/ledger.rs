//! # Ledger Status API

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use ccv_ledger::{TransactionHandle, TransactionStatus};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/ledger/transactions/{handle}", get(transaction_status))
}

/// GET /v1/ledger/transactions/{handle}: Ledger status of a submission.
#[utoipa::path(
    get,
    path = "/v1/ledger/transactions/{handle}",
    params(("handle" = String, Path, description = "Transaction handle")),
    responses(
        (status = 200, description = "Transaction status"),
        (status = 404, description = "Unknown handle", body = crate::error::ErrorBody),
        (status = 502, description = "Ledger unavailable", body = crate::error::ErrorBody),
    ),
    tag = "ledger"
)]
pub async fn transaction_status(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<TransactionStatus>, AppError> {
    let handle = TransactionHandle::new(handle);
    Ok(Json(state.ledger.status(&handle).await?))
}
