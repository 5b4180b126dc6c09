pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod profiles;
pub mod res;
pub mod session;
pub mod signup;
pub mod spaces;
pub mod storage;

use axum::extract::FromRef;
use sqlx::SqlitePool;

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub channels: spaces::SpaceChannels,
    pub config: Config,
}
