mod channels;
mod delete;
mod msg;
mod new;
mod rename;
pub mod service;
mod space;
mod ws;

pub use channels::SpaceChannels;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new", post(new::create_space))
        .route("/{id}", get(space::space_page))
        .route("/{id}/rename", post(rename::rename_space))
        .route("/{id}/delete", post(delete::delete_space))
        .route("/{id}/ws", get(ws::space_ws))
}
