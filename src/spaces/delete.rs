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

use crate::{
    profiles::{resolver, ProfileStatus},
    session, AppError, AppResult,
};

use super::service;

#[derive(Deserialize)]
pub(crate) struct DeleteForm {
    #[serde(default)]
    confirm: bool,
}

/// Deletion needs explicit confirmation. When the open space goes away the
/// next most-recently-accessed one takes over; with nothing left, the
/// canonical route shows its empty state.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_space(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(DeleteForm { confirm }): Form<DeleteForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    if !confirm {
        return Err(AppError::Validation(
            "deleting a Visual Space requires confirmation".to_string(),
        ));
    }

    match service::delete(&db_pool, &user_id, &id.to_string()).await? {
        Some(next) => Ok(Redirect::to(&format!("/space/{}", next.id)).into_response()),
        None => {
            let status = resolver::resolve(&db_pool, Some(&user_id)).await;
            let to = match &status {
                ProfileStatus::Complete { username } => format!("/{username}"),
                _ => "/".to_string(),
            };
            Ok(Redirect::to(&to).into_response())
        }
    }
}
