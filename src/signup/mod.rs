//! Two-step registration: credentials first, then profile details plus the
//! initial Visual Space. OAuth entry skips the credentials step but never
//! the profile step.

mod level1;
mod level2;
mod username;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", get(level1::page).post(level1::submit))
        .route("/signup/level2", get(level2::page).post(level2::submit))
        .route("/signup/check_username", get(username::check_username))
}
