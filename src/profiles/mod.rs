pub mod guard;
mod page;
pub mod resolver;

pub use resolver::ProfileStatus;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{username}", get(page::canonical))
}
