use axum::{
    debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    include_res,
    profiles::{guard, resolver, ProfileStatus},
    res, session, AppResult,
};

use super::{msg, service};

/// Space page: recency-ordered sidebar, chat history and the live panel.
/// Opening a space counts as selecting it, which bumps `last_accessed`.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn space_page(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let account_id = session::current_user(&session).await?;
    let status = resolver::resolve(&db_pool, account_id.as_deref()).await;

    let path = format!("/space/{id}");
    if let Some(to) = guard::redirect_for(&status, &path) {
        return Ok(Redirect::to(&to).into_response());
    }
    let ProfileStatus::Complete { username } = status else {
        return Ok(Redirect::to("/login").into_response());
    };

    let user_id = account_id.unwrap_or_default();
    let Some(space) = service::get(&db_pool, &id.to_string()).await? else {
        return res::sorry("space");
    };
    if space.user_id != user_id {
        return res::sorry("space");
    }

    service::touch(&db_pool, &space.id).await?;

    let mut space_items = String::new();
    for s in service::list(&db_pool, &user_id).await? {
        space_items += &include_res!(str, "/pages/space_item.html")
            .replace("{id}", &s.id)
            .replace("{title}", &s.title)
            .replace("{current}", if s.id == space.id { " current" } else { "" });
    }

    let messages = msg::history_html(&db_pool, &space.id).await?;

    Ok(Html(
        include_res!(str, "/pages/space.html")
            .replace("{space_id}", &space.id)
            .replace("{title}", &space.title)
            .replace("{username}", &username)
            .replace("{space_items}", &space_items)
            .replace("{messages}", &messages),
    )
    .into_response())
}
