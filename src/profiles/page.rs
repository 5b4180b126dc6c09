use axum::{
    debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{include_res, session, spaces, AppResult};

use super::{guard, resolver};

/// Canonical workspace route: `/{username}` opens the user's most recently
/// accessed space, or the empty state when none exist.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn canonical(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let account_id = session::current_user(&session).await?;
    let status = resolver::resolve(&db_pool, account_id.as_deref()).await;

    let path = format!("/{username}");
    if let Some(to) = guard::redirect_for(&status, &path) {
        return Ok(Redirect::to(&to).into_response());
    }

    // guard passed, so the session is complete and this is its own route
    let user_id = account_id.unwrap_or_default();
    match spaces::service::most_recent(&db_pool, &user_id).await? {
        Some(space) => Ok(Redirect::to(&format!("/space/{}", space.id)).into_response()),
        None => Ok(Html(
            include_res!(str, "/pages/no_space.html").replace("{username}", &username),
        )
        .into_response()),
    }
}
