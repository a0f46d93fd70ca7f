//! # OpenAPI Document
//!
//! Assembled from the `utoipa::path` annotations and served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circle Cipher Vault API",
        version = "0.1.0",
        description = "Lending circles with confidential contributions: circle lifecycle, commitment-backed payments, round settlement, and ledger status."
    ),
    paths(
        // Circles
        crate::routes::circles::create_circle,
        crate::routes::circles::list_circles,
        crate::routes::circles::get_circle,
        crate::routes::circles::join_circle,
        crate::routes::circles::activate_circle,
        crate::routes::circles::cancel_circle,
        // Members
        crate::routes::members::get_member,
        crate::routes::members::exclude_member,
        crate::routes::members::member_dashboard,
        // Rounds
        crate::routes::rounds::round_state,
        crate::routes::rounds::record_payment,
        crate::routes::rounds::complete_round,
        crate::routes::rounds::overdue_rounds,
        // Ledger
        crate::routes::ledger::transaction_status,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::circles::CreateCircleRequest,
        crate::routes::circles::JoinCircleRequest,
        crate::routes::circles::ReasonRequest,
        crate::routes::rounds::PaymentRequest,
    )),
    tags(
        (name = "circles", description = "Circle lifecycle"),
        (name = "members", description = "Membership and dashboards"),
        (name = "rounds", description = "Contributions and settlement"),
        (name = "ledger", description = "Ledger submissions"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
