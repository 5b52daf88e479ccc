//! Habitz backend library
//!
//! Exposes the server components for use in integration tests.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod state;

pub use config::Config;
pub use connection::RelayOutcome;
pub use db::Database;
pub use events::WsEvent;
pub use notifier::Mailer;
pub use state::RelayState;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared state behind every HTTP and socket handler.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub relay: RelayState,
    pub mailer: Mailer,
}

/// Build the application router: REST groups under /api, the chat
/// socket on /ws, and a liveness string at the root.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(index))
        .route("/ws", get(connection::ws_handler))
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state)
}

async fn index() -> &'static str {
    "Habitz API is running..."
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
