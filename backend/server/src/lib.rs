//! Backend for the contact form and waitlist of a single-operator consulting site.
//!
//!
//!
//! # General Infrastructure
//! - Site pages are rendered and served elsewhere; this server only takes form posts
//! - One instance behind the reverse proxy, which forwards `X-Forwarded-For`
//! - Redis holds submissions in production, memory is fine for local work
//! - Admin reads go through the same store gateway as the forms
//!
//!
//!
//! # Preventing Abuse
//!
//! **Goal**: keep junk out of the store without making a real visitor fill anything extra in.
//!
//! - Every `/api` request counts against its IP: 60 per 60 second window, 429 with `Retry-After` beyond that
//! - Completed submissions hand back a cookie with the submission time, valid 60 seconds
//! - A second submission while that cookie is live is refused before validation
//! - The cookie is a courtesy throttle only, a client can drop it; the IP window is the real barrier
//! - Free text in the contact message is escaped before it is written
//!
//!
//!
//! # Notes
//!
//! ## IP windows
//! The IP table is process memory. A second instance would double the allowance, so scale
//! out only after the counters move into Redis.
//!
//! ## Waitlist duplicates
//! `HSETNX` does the duplicate check and the insert in one command. A repeat signup is
//! reported as a success with `alreadyExists` rather than as an error.
//!
//!
//!
//! # Setup
//!
//! Run locally against the in-memory store.
//! ```sh
//! RUST_LOG=info cargo run -p backend
//! ```
//!
//! Run against Redis.
//! ```sh
//! STORE=redis REDIS_URL=redis://127.0.0.1:6379 cargo run -p backend
//! ```
//!
//! Burst the limiter from another shell.
//! ```sh
//! cargo run -p tester -- --requests 70 waitlist
//! ```
//!
//! Generate docs in `target/doc/packageName/index.html`.
//! ```sh
//! cargo doc
//! ```
use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    middleware::from_fn_with_state,
    routing::{get, post},
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod admin;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod utils;

use admin::{contact_submissions_handler, login_handler, logout_handler, waitlist_entries_handler};
use config::Config;
use middleware::{ip_rate_limit, login_rate_limit, with_security_headers};
use routes::{contact_handler, waitlist_handler};
use state::AppState;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;
    let sweepers = [
        state.ip_limiter.spawn_sweeper(),
        state.login_limiter.spawn_sweeper(),
    ];

    info!("Starting server...");
    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweepers.iter().for_each(|sweeper| sweeper.abort());
    info!("Server shut down");

    served.context("Server error")
}

pub fn app(state: Arc<AppState>) -> Router {
    let origin = match &state.config.allowed_origin {
        Some(origin) => AllowOrigin::exact(origin.clone()),
        None => AllowOrigin::any(),
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/contact", post(contact_handler))
        .route("/waitlist", post(waitlist_handler))
        .route_layer(from_fn_with_state(state.clone(), ip_rate_limit));

    let admin = Router::new()
        .route(
            "/login",
            post(login_handler)
                .route_layer(from_fn_with_state(state.clone(), login_rate_limit)),
        )
        .route("/logout", post(logout_handler))
        .route("/contact-submissions", get(contact_submissions_handler))
        .route("/waitlist", get(waitlist_entries_handler));

    let router = Router::new()
        .nest("/api", api)
        .nest("/admin", admin)
        .layer(cors)
        .with_state(state);

    with_security_headers(router)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {e}"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
