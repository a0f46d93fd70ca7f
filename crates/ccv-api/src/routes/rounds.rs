//! # Round API
//!
//! Round status, confidential contributions, and settlement.
//!
//! A payment carries the member's commitment and range proof. It may also
//! carry the opening, which is checked against the commitment before
//! anything is recorded, then deposited with the escrow tally so the pool
//! total can be revealed. A deposit that fails after the payment is recorded
//! does not fail the request; the receipt reports `opening_deposited: false`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use ccv_core::{CircleId, MemberId};
use ccv_crypto::{ContributionCommitment, ContributionOpening};
use ccv_ledger::LedgerAction;
use ccv_settlement::{CircleRegistry, OverdueRound, PaymentReceipt, RoundSettlement, RoundView};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_acting_as, require_operator, Caller};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_member_id, Validate};
use crate::middleware::metrics::PAYMENTS_RECORDED_TOTAL;
use crate::orchestration::{spawn_audit, spawn_settlement};
use crate::routes::circle_id;
use crate::state::AppState;

/// A member's contribution to a round.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentRequest {
    pub member_id: String,
    /// Pedersen commitment and range proof, hex encoded.
    #[schema(value_type = Object)]
    pub contribution: ContributionCommitment,
    /// Amount and blinding, for the escrow tally.
    #[schema(value_type = Option<Object>)]
    pub opening: Option<ContributionOpening>,
}

impl Validate for PaymentRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(opening) = &self.opening {
            if !opening.opens(&self.contribution.commitment) {
                return Err("opening does not match the commitment".to_string());
            }
        }
        Ok(())
    }
}

/// Receipt for a recorded payment.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub receipt: PaymentReceipt,
    /// Whether the opening was deposited with the escrow tally.
    pub opening_deposited: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/circles/{id}/rounds/{index}", get(round_state))
        .route("/v1/circles/{id}/rounds/{index}/payments", post(record_payment))
        .route("/v1/circles/{id}/rounds/{index}/complete", post(complete_round))
        .route("/v1/rounds/overdue", get(overdue_rounds))
}

/// GET /v1/circles/{id}/rounds/{index}: Round status.
#[utoipa::path(
    get,
    path = "/v1/circles/{id}/rounds/{index}",
    params(
        ("id" = Uuid, Path, description = "Circle ID"),
        ("index" = u32, Path, description = "Round index, from 0"),
    ),
    responses(
        (status = 200, description = "Round status"),
        (status = 404, description = "Circle not found", body = crate::error::ErrorBody),
        (status = 409, description = "Round not open yet", body = crate::error::ErrorBody),
    ),
    tag = "rounds"
)]
pub async fn round_state(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, u32)>,
) -> Result<Json<RoundView>, AppError> {
    let now = state.registry.now();
    Ok(Json(state.registry.round_state(circle_id(id), index, now)?))
}

/// POST /v1/circles/{id}/rounds/{index}/payments: Record a contribution.
#[utoipa::path(
    post,
    path = "/v1/circles/{id}/rounds/{index}/payments",
    params(
        ("id" = Uuid, Path, description = "Circle ID"),
        ("index" = u32, Path, description = "Round index, from 0"),
    ),
    request_body = PaymentRequest,
    responses(
        (status = 201, description = "Payment recorded"),
        (status = 409, description = "Duplicate, closed round, or not a member", body = crate::error::ErrorBody),
        (status = 422, description = "Proof or opening rejected", body = crate::error::ErrorBody),
    ),
    tag = "rounds"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, index)): Path<(Uuid, u32)>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let member_id = parse_member_id(&req.member_id)?;
    require_acting_as(&caller, &member_id)?;
    let circle = circle_id(id);

    let receipt = state
        .registry
        .record_payment(circle, index, &member_id, req.contribution)?;
    metrics::counter!(PAYMENTS_RECORDED_TOTAL).increment(1);

    let opening_deposited = req.opening.as_ref().is_some_and(|opening| {
        deposit_recorded_opening(&state.registry, circle, index, &member_id, opening)
    });

    spawn_audit(
        &state,
        LedgerAction::RecordContribution,
        json!({
            "circle_id": id,
            "round_index": index,
            "member_id": member_id,
            "digest": receipt.digest,
        }),
    );
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            receipt,
            opening_deposited,
        }),
    ))
}

/// Deposit the opening of an already recorded payment. The payment stands
/// whatever the outcome; a failure is logged and reported as `false`.
fn deposit_recorded_opening(
    registry: &CircleRegistry,
    circle: CircleId,
    index: u32,
    member_id: &MemberId,
    opening: &ContributionOpening,
) -> bool {
    match registry.deposit_opening(circle, index, member_id, opening) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                circle_id = %circle,
                round_index = index,
                member_id = %member_id,
                error = %e,
                "payment recorded, opening not deposited"
            );
            false
        }
    }
}

/// POST /v1/circles/{id}/rounds/{index}/complete: Pay out the round.
///
/// The ledger settlement is submitted in the background; its status shows
/// up on the round once known.
#[utoipa::path(
    post,
    path = "/v1/circles/{id}/rounds/{index}/complete",
    params(
        ("id" = Uuid, Path, description = "Circle ID"),
        ("index" = u32, Path, description = "Round index, from 0"),
    ),
    responses(
        (status = 200, description = "Round completed"),
        (status = 409, description = "Payments outstanding or overdue, or already completed", body = crate::error::ErrorBody),
    ),
    tag = "rounds"
)]
pub async fn complete_round(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, index)): Path<(Uuid, u32)>,
) -> Result<Json<RoundSettlement>, AppError> {
    require_operator(&caller)?;
    let settlement = state.registry.complete_round(circle_id(id), index)?;
    spawn_settlement(&state, &settlement);
    Ok(Json(settlement))
}

/// GET /v1/rounds/overdue: Rounds past their deadline with unpaid members.
#[utoipa::path(
    get,
    path = "/v1/rounds/overdue",
    responses((status = 200, description = "Overdue rounds, earliest deadline first")),
    tag = "rounds"
)]
pub async fn overdue_rounds(State(state): State<AppState>) -> Json<Vec<OverdueRound>> {
    let now = state.registry.now();
    Json(state.registry.overdue_rounds(now))
}
