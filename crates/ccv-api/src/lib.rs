//! # ccv-api
//!
//! HTTP service over the circle registry.
//!
//! ## API Surface
//!
//! | Prefix                          | Module                 |
//! |---------------------------------|------------------------|
//! | `/v1/circles`, `/v1/circles/{id}/*` | [`routes::circles`] |
//! | `/v1/circles/{id}/members/*`, `/v1/members/*` | [`routes::members`] |
//! | `/v1/circles/{id}/rounds/*`, `/v1/rounds/*` | [`routes::rounds`] |
//! | `/v1/ledger/*`                  | [`routes::ledger`]     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → metrics → auth → handler
//! ```
//!
//! Health probes and `/metrics` are mounted outside auth.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod orchestration;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::circles::router())
        .merge(routes::members::router())
        .merge(routes::rounds::router())
        .merge(routes::ledger::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let open = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(render_metrics))
        .with_state(state);

    Router::new().merge(open).merge(api)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus text exposition, when metrics are enabled.
async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
