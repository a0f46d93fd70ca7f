//! # Membership API
//!
//! Member standing, administrative exclusion, and the member dashboard.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use ccv_settlement::{MemberDashboard, MemberView};
use ccv_state::Membership;
use uuid::Uuid;

use crate::auth::{require_operator, Caller};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_member_id};
use crate::routes::circle_id;
use crate::routes::circles::ReasonRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/circles/{id}/members/{member_id}", get(get_member))
        .route(
            "/v1/circles/{id}/members/{member_id}/exclude",
            post(exclude_member),
        )
        .route("/v1/members/{member_id}/dashboard", get(member_dashboard))
}

/// GET /v1/circles/{id}/members/{member_id}: A member's standing.
#[utoipa::path(
    get,
    path = "/v1/circles/{id}/members/{member_id}",
    params(
        ("id" = Uuid, Path, description = "Circle ID"),
        ("member_id" = String, Path, description = "Member ID"),
    ),
    responses(
        (status = 200, description = "Member standing"),
        (status = 404, description = "Circle not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not a member", body = crate::error::ErrorBody),
    ),
    tag = "members"
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(Uuid, String)>,
) -> Result<Json<MemberView>, AppError> {
    let member_id = parse_member_id(&member_id)?;
    Ok(Json(state.registry.get_member_state(circle_id(id), &member_id)?))
}

/// POST /v1/circles/{id}/members/{member_id}/exclude: Exclude a member.
#[utoipa::path(
    post,
    path = "/v1/circles/{id}/members/{member_id}/exclude",
    params(
        ("id" = Uuid, Path, description = "Circle ID"),
        ("member_id" = String, Path, description = "Member ID"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Member excluded"),
        (status = 409, description = "Not a member or circle closed", body = crate::error::ErrorBody),
    ),
    tag = "members"
)]
pub async fn exclude_member(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, member_id)): Path<(Uuid, String)>,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> Result<Json<Membership>, AppError> {
    require_operator(&caller)?;
    let req = extract_validated_json(body)?;
    let member_id = parse_member_id(&member_id)?;
    Ok(Json(state.registry.exclude_member(
        circle_id(id),
        &member_id,
        &req.reason,
    )?))
}

/// GET /v1/members/{member_id}/dashboard: Participation statistics.
#[utoipa::path(
    get,
    path = "/v1/members/{member_id}/dashboard",
    params(("member_id" = String, Path, description = "Member ID")),
    responses((status = 200, description = "Dashboard")),
    tag = "members"
)]
pub async fn member_dashboard(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<MemberDashboard>, AppError> {
    let member_id = parse_member_id(&member_id)?;
    Ok(Json(state.registry.member_dashboard(&member_id)))
}
