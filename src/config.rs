//! Environment configuration.
//!
//! Everything the process consumes from the environment is gathered once at
//! startup into a [`Config`] so the rest of the code never touches `env`.

use std::env;

pub const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";
const DEFAULT_DATABASE_PATH: &str = "habitz.db";

/// Credentials for the outbound mail account.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Origins allowed to make cross-origin requests, trailing slash stripped.
    pub allowed_origins: Vec<String>,
    pub database_path: String,
    /// `None` when GMAIL_USER / GMAIL_APP_PASSWORD are not set.
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| DEFAULT_CLIENT_URL.to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| DEFAULT_CLIENT_URL.to_string());

        let mut allowed_origins = vec![normalize_origin(&client_url)];
        let frontend_origin = normalize_origin(&frontend_url);
        if !allowed_origins.contains(&frontend_origin) {
            allowed_origins.push(frontend_origin);
        }

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());

        let smtp = match (env::var("GMAIL_USER"), env::var("GMAIL_APP_PASSWORD")) {
            (Ok(user), Ok(password)) if !user.is_empty() && !password.is_empty() => {
                Some(SmtpConfig { user, password })
            }
            _ => None,
        };

        Self {
            port,
            allowed_origins,
            database_path,
            smtp,
        }
    }
}

/// Strip a trailing slash so configured URLs compare equal to Origin headers.
pub fn normalize_origin(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}
