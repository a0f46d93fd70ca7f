//! # ccv-api: Binary Entry Point
//!
//! Loads configuration from the environment, bootstraps state, starts the
//! overdue-round scan, and serves the API.

use std::time::Duration;

use ccv_api::state::AppConfig;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("CCV_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");
    let port = config.port;
    let scan_every = Duration::from_secs(config.overdue_scan_secs.max(1));
    let metrics_enabled = config.metrics_enabled;

    let mut state = ccv_api::bootstrap::bootstrap(config).map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;
    if metrics_enabled {
        let handle = ccv_api::middleware::metrics::install_recorder()?;
        state = state.with_metrics(handle);
        tracing::info!("Prometheus metrics enabled at /metrics");
    }

    let registry = state.registry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(scan_every);
        loop {
            ticker.tick().await;
            ccv_api::orchestration::scan_overdue(&registry);
        }
    });

    let app = ccv_api::app(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("CCV API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
