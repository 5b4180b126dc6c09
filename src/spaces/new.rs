use axum::{
    debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session, AppResult};

use super::service;

#[derive(Deserialize)]
pub(crate) struct NewSpaceForm {
    title: String,
    #[serde(default)]
    description: String,
}

/// A title collision aborts with a conflict naming a free alternative.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn create_space(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(NewSpaceForm { title, description }): Form<NewSpaceForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let description = description.trim();
    let space = service::create(
        &db_pool,
        &user_id,
        &title,
        (!description.is_empty()).then_some(description),
    )
    .await?;

    Ok(Redirect::to(&format!("/space/{}", space.id)).into_response())
}
