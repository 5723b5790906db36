// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Admission Service
//!
//! Receives contact-form submissions for the website and stores the ones
//! that pass validation, rate limiting, spam heuristics and the per-email
//! volume guard.
//!
//! ## Endpoints
//!
//! - `POST /api/contact`: submit the form
//! - `POST /api/contact/validate`: field checks only, for the form UI
//! - `GET /health`, `GET /healthz`
//! - `GET /metrics`: Prometheus exposition
//!
//! ## Configuration
//!
//! An optional JSON file named by `CONFIG_FILE`, then environment
//! overrides:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX`: Requests per address per window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
//! - `MIN_SUBMIT_MS`: Fastest plausible human submission (default: 2000)
//! - `MAX_PER_EMAIL`: Accepted submissions per email per day (default: 3)
//! - `STORE_PATH`: `memory` or a JSON Lines file (default: memory)
//! - `TRUST_FORWARDED_FOR`: Use `X-Forwarded-For` as source (default: false)

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_admission::{
    config::Config,
    handlers::{self, AppState},
    metrics::AdmissionMetrics,
    pipeline::AdmissionPipeline,
    store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        failure_policy = ?config.rate_limit.failure_policy,
        min_submit_ms = config.spam.min_submit_ms,
        max_per_email = config.duplicate.max_per_email,
        store = %config.store.path,
        "Starting contact admission service"
    );

    // Create application state
    let store = store::open_store(&config.store.path).await?;
    let mut pipeline = AdmissionPipeline::new(&config, store);
    if config.metrics.enabled {
        pipeline = pipeline.with_metrics(AdmissionMetrics::new()?);
    }

    let state = Arc::new(AppState {
        pipeline,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(cleanup_state.config.rate_limit.cleanup_interval());
        loop {
            interval.tick().await;
            let now = cleanup_state.pipeline.clock().now();
            cleanup_state.pipeline.limiter().cleanup(now).await;
        }
    });

    // Build router
    let app: Router = handlers::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
