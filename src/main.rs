use std::sync::Arc;

use habitz_server::{app, AppState, Config, Database, Mailer, RelayState};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let db = match Database::open(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database_path, e);
            std::process::exit(1);
        }
    };

    let mailer = Mailer::from_config(config.smtp.as_ref());

    let state = Arc::new(AppState {
        db,
        relay: RelayState::new(),
        mailer,
        config: config.clone(),
    });

    // Mail connectivity self-check, diagnostics only
    {
        let state = state.clone();
        tokio::spawn(async move {
            state.mailer.verify().await;
        });
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server is running on port {}", config.port);

    if let Err(e) = axum::serve(listener, app(state)).await {
        error!("Server error: {}", e);
    }
}
