// src/lib.rs
//! Poll and search-history service for the forum.
//!
//! # Polls
//! - Created from the post composer, referenced in post content as
//!   `[poll:<pollId>]` (see [`embed`])
//! - One vote per user, which can be moved to another option until the
//!   creator closes the poll
//! - Percentages and `hasVoted`/`isCreator` are computed per viewer, never
//!   stored
//!
//! # Search history
//! - Last 10 queries per user, newest first, re-running a query moves it up
//! - Autocomplete is a case-insensitive prefix match over the same list
//!
//! # Storage
//! Postgres when `DATABASE_URL` is set, in-memory otherwise. See [`db`].
//!
//! # Running
//! ```sh
//! RUST_LOG=poll_search_backend=debug DATABASE_URL=postgres://localhost/forum cargo run
//! ```
use http::{header::CONTENT_TYPE, HeaderName, Method};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod caller;
pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod handlers;
pub mod history;
pub mod models;
pub mod poll;
pub mod routes;
pub mod state;
pub mod suggest;

use caller::UID_HEADER;
use config::Config;
use db::Store;
use error::StartupError;
use state::AppState;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poll_search_backend=info,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn start_server() -> Result<(), StartupError> {
    init_tracing();

    let config = Config::load()?;

    info!("Initializing state...");
    let store = Store::connect(&config).await?;
    let state = AppState::new(store);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(UID_HEADER)])
        .max_age(config.cors_max_age);

    let app = routes::create_routes(state).layer(cors);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
