use std::{fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Base URL clients reach us under; used to build OAuth redirect URLs.
    pub public_url: String,
    pub uploads_dir: PathBuf,
    pub client_secret_path: String,
    pub session_minutes: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080"),
            database_url: try_load("DATABASE_URL", "sqlite://polymat.db?mode=rwc"),
            public_url: try_load("PUBLIC_URL", "http://localhost:8080"),
            uploads_dir: PathBuf::from(try_load::<String>("UPLOADS_DIR", "uploads")),
            client_secret_path: try_load("CLIENT_SECRET_PATH", "client_secret.json"),
            session_minutes: try_load("SESSION_MINUTES", "60"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    dotenv::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("invalid {key} value: {e}");
        })
        .expect("environment misconfigured")
}
