//! Documentation of a consultation intake service.
//!
//! Visitors fill in a consultation form on the site, the form lands here, gets written to a
//! JSON file on disk, and a notification email goes out to the front desk.
//!
//!
//!
//! # Routes
//! - `POST /api/consultation`: JSON object or urlencoded form, any fields, other content
//!   types count as an empty body
//! - `GET /api/consultations`: every stored consultation, oldest first
//! - `GET /admin`: static admin page, it fetches the list itself
//! - Anything else falls through to the static directory
//!
//! Every JSON response carries `success` plus either `message` or `consultations`.
//!
//!
//!
//! # Submission Flow
//! - Empty or unreadable body is rejected with 400 before storage is touched
//! - Record gets `id` (epoch millis) and `timestamp` (ISO-8601), then every submitted field,
//!   a submitted `id` or `timestamp` overrides the assigned one
//! - Append to the document, 500 if that fails
//! - Notification email is spawned and left to finish on its own
//! - 200 with the acknowledgement text
//!
//! A failed email never turns a saved submission into an error. The submitter sees the same
//! response either way, the failure is only logged.
//!
//!
//!
//! # Known Gaps
//! - No authentication, the list and admin page are open to anyone who can reach the port
//! - `id` is not unique when two submissions share a millisecond
//! - Two processes pointed at the same document can lose each other's appends
//!
//!
//!
//! # Setup
//!
//! Configuration comes from the environment, a `.env` file in the working directory is
//! loaded first if present.
//! ```sh
//! PORT=3000
//! EMAIL_USER=desk@163.com
//! EMAIL_PASS=app-password
//! DB_PATH=db.json
//! ```
//!
//! Run.
//! ```sh
//! RUST_LOG=info cargo run -p consult-backend
//! ```
//!
//! Log every submitted payload.
//! ```sh
//! cargo run -p consult-backend --features verbose
//! ```
use std::{any::Any, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

pub mod config;
pub mod database;
pub mod error;
pub mod mail;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use error::AppError;
use routes::{list_handler, submit_handler};
use state::AppState;

pub async fn start_server() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on http://localhost:{}", state.config.port);
    info!("Admin page: http://localhost:{}/admin", state.config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/api/consultation", post(submit_handler))
        .route("/api/consultations", get(list_handler))
        .route_service("/admin", ServeFile::new(&state.config.admin_page))
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(trace)
        .with_state(state)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(detail).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
