//! # Circle Lifecycle API
//!
//! Creation, listing, snapshots, joining, activation, and cancellation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use ccv_core::{Amount, Currency, Timestamp};
use ccv_ledger::LedgerAction;
use ccv_settlement::{CircleFilter, CircleSnapshot, CircleSummary, CreateCircleParams, JoinOutcome};
use ccv_state::{Circle, PaymentFrequency};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_acting_as, require_operator, Caller};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_member_id, Validate};
use crate::orchestration::spawn_audit;
use crate::routes::circle_id;
use crate::state::AppState;

/// Request to create a circle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCircleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Member id of the creator. Not enrolled automatically.
    pub creator: String,
    /// `USDC`, `ETH`, or `DAI`.
    pub currency: String,
    /// `weekly`, `biweekly`, or `monthly`.
    pub frequency: String,
    pub capacity: u32,
    /// Contribution per member per round, in the currency's minor unit.
    pub per_round_amount: u64,
    /// Defaults to `capacity`.
    pub total_rounds: Option<u32>,
    /// RFC 3339 start time. Defaults to now.
    pub start_time: Option<String>,
}

impl Validate for CreateCircleRequest {
    fn validate(&self) -> Result<(), String> {
        self.currency
            .parse::<Currency>()
            .map_err(|e| e.to_string())?;
        self.frequency.parse::<PaymentFrequency>()?;
        if let Some(start) = &self.start_time {
            Timestamp::parse(start).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl CreateCircleRequest {
    fn into_params(self, now: Timestamp) -> Result<CreateCircleParams, AppError> {
        let currency = self.currency.parse::<Currency>()?;
        let frequency = self
            .frequency
            .parse::<PaymentFrequency>()
            .map_err(AppError::Validation)?;
        let start_time = match &self.start_time {
            Some(s) => Timestamp::parse(s)?,
            None => now,
        };
        Ok(CreateCircleParams {
            creator: parse_member_id(&self.creator)?,
            total_rounds: self.total_rounds.unwrap_or(self.capacity),
            name: self.name,
            description: self.description,
            currency,
            frequency,
            capacity: self.capacity,
            per_round_amount: Amount(self.per_round_amount),
            start_time,
        })
    }
}

/// Request to join a circle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinCircleRequest {
    pub member_id: String,
}

impl Validate for JoinCircleRequest {
    fn validate(&self) -> Result<(), String> {
        if self.member_id.trim().is_empty() {
            return Err("member_id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request carrying an operator's reason.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: String,
}

impl Validate for ReasonRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        if self.reason.len() > 500 {
            return Err("reason must not exceed 500 characters".to_string());
        }
        Ok(())
    }
}

/// Listing query.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ListCirclesQuery {
    pub member_id: Option<String>,
    /// `all` (default), `joined`, or `available`.
    pub view: Option<String>,
}

impl ListCirclesQuery {
    fn filter(&self) -> Result<CircleFilter, AppError> {
        let member = || {
            self.member_id
                .as_deref()
                .ok_or_else(|| AppError::Validation("member_id is required for this view".into()))
                .and_then(parse_member_id)
        };
        match self.view.as_deref().unwrap_or("all") {
            "all" => Ok(CircleFilter::All),
            "joined" => Ok(CircleFilter::Joined(member()?)),
            "available" => Ok(CircleFilter::Available(member()?)),
            other => Err(AppError::Validation(format!(
                "unknown view {other:?}, expected all, joined, or available"
            ))),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/circles", get(list_circles).post(create_circle))
        .route("/v1/circles/{id}", get(get_circle))
        .route("/v1/circles/{id}/join", post(join_circle))
        .route("/v1/circles/{id}/activate", post(activate_circle))
        .route("/v1/circles/{id}/cancel", post(cancel_circle))
}

/// POST /v1/circles: Create a circle in `forming` status.
#[utoipa::path(
    post,
    path = "/v1/circles",
    request_body = CreateCircleRequest,
    responses(
        (status = 201, description = "Circle created"),
        (status = 422, description = "Invalid parameters", body = crate::error::ErrorBody),
    ),
    tag = "circles"
)]
pub async fn create_circle(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateCircleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Circle>), AppError> {
    let req = extract_validated_json(body)?;
    let params = req.into_params(state.registry.now())?;
    require_acting_as(&caller, &params.creator)?;

    let circle = state.registry.create_circle(params)?;
    spawn_audit(
        &state,
        LedgerAction::CreateCircle,
        json!({
            "circle_id": circle.id.as_uuid(),
            "creator": circle.terms.creator,
            "currency": circle.terms.currency,
            "capacity": circle.terms.capacity,
            "per_round_amount": circle.terms.per_round_amount,
        }),
    );
    Ok((StatusCode::CREATED, Json(circle)))
}

/// GET /v1/circles: List circles.
#[utoipa::path(
    get,
    path = "/v1/circles",
    params(
        ("member_id" = Option<String>, Query, description = "Member for joined/available views"),
        ("view" = Option<String>, Query, description = "all, joined, or available"),
    ),
    responses(
        (status = 200, description = "Circle summaries"),
        (status = 422, description = "Invalid view", body = crate::error::ErrorBody),
    ),
    tag = "circles"
)]
pub async fn list_circles(
    State(state): State<AppState>,
    Query(query): Query<ListCirclesQuery>,
) -> Result<Json<Vec<CircleSummary>>, AppError> {
    let filter = query.filter()?;
    Ok(Json(state.registry.list_circles(&filter)))
}

/// GET /v1/circles/{id}: Consistent snapshot of a circle.
#[utoipa::path(
    get,
    path = "/v1/circles/{id}",
    params(("id" = Uuid, Path, description = "Circle ID")),
    responses(
        (status = 200, description = "Circle snapshot"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "circles"
)]
pub async fn get_circle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CircleSnapshot>, AppError> {
    Ok(Json(state.registry.get_circle_state(circle_id(id))?))
}

/// POST /v1/circles/{id}/join: Join a circle.
#[utoipa::path(
    post,
    path = "/v1/circles/{id}/join",
    params(("id" = Uuid, Path, description = "Circle ID")),
    request_body = JoinCircleRequest,
    responses(
        (status = 200, description = "Joined"),
        (status = 409, description = "Full, closed, or already joined", body = crate::error::ErrorBody),
    ),
    tag = "circles"
)]
pub async fn join_circle(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<JoinCircleRequest>, JsonRejection>,
) -> Result<Json<JoinOutcome>, AppError> {
    let req = extract_validated_json(body)?;
    let member_id = parse_member_id(&req.member_id)?;
    require_acting_as(&caller, &member_id)?;

    let outcome = state.registry.join_circle(circle_id(id), member_id)?;
    spawn_audit(
        &state,
        LedgerAction::JoinCircle,
        json!({
            "circle_id": id,
            "member_id": outcome.membership.member_id,
            "join_seq": outcome.membership.join_seq,
        }),
    );
    Ok(Json(outcome))
}

/// POST /v1/circles/{id}/activate: Start a forming circle early.
#[utoipa::path(
    post,
    path = "/v1/circles/{id}/activate",
    params(("id" = Uuid, Path, description = "Circle ID")),
    responses(
        (status = 200, description = "Circle activated"),
        (status = 409, description = "Not enough members or not forming", body = crate::error::ErrorBody),
    ),
    tag = "circles"
)]
pub async fn activate_circle(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Circle>, AppError> {
    require_operator(&caller)?;
    Ok(Json(state.registry.activate(circle_id(id))?))
}

/// POST /v1/circles/{id}/cancel: Cancel a forming or active circle.
#[utoipa::path(
    post,
    path = "/v1/circles/{id}/cancel",
    params(("id" = Uuid, Path, description = "Circle ID")),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Circle cancelled"),
        (status = 409, description = "Already closed", body = crate::error::ErrorBody),
    ),
    tag = "circles"
)]
pub async fn cancel_circle(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> Result<Json<Circle>, AppError> {
    require_operator(&caller)?;
    let req = extract_validated_json(body)?;
    Ok(Json(state.registry.cancel(circle_id(id), &req.reason)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCircleRequest {
        CreateCircleRequest {
            name: "Neighbours".into(),
            description: String::new(),
            creator: "host".into(),
            currency: "usdc".into(),
            frequency: "weekly".into(),
            capacity: 5,
            per_round_amount: 100,
            total_rounds: None,
            start_time: None,
        }
    }

    #[test]
    fn total_rounds_default_to_capacity() {
        let now = Timestamp::from_epoch_secs(1_767_225_600).unwrap();
        let params = request().into_params(now).unwrap();
        assert_eq!(params.total_rounds, 5);
        assert_eq!(params.start_time, now);
        assert_eq!(params.currency, Currency::Usdc);
    }

    #[test]
    fn unknown_currency_fails_validation() {
        let req = CreateCircleRequest {
            currency: "DOGE".into(),
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn unknown_frequency_fails_validation() {
        let req = CreateCircleRequest {
            frequency: "daily".into(),
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn joined_view_requires_member() {
        let query = ListCirclesQuery {
            member_id: None,
            view: Some("joined".into()),
        };
        assert!(query.filter().is_err());
        let query = ListCirclesQuery {
            member_id: Some("alice".into()),
            view: Some("available".into()),
        };
        assert!(matches!(query.filter().unwrap(), CircleFilter::Available(_)));
    }
}
