use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{session, AppResult};

use super::service;

#[derive(Deserialize)]
pub(crate) struct RenameForm {
    title: String,
}

/// A title collision aborts with a conflict naming a free alternative,
/// same as creating a space.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn rename_space(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(RenameForm { title }): Form<RenameForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let space = service::rename(&db_pool, &user_id, &id.to_string(), &title).await?;
    Ok(Redirect::to(&format!("/space/{}", space.id)).into_response())
}
