use axum::{
    debug_handler,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    db, include_res,
    profiles::{guard, resolver},
    session, AppResult,
};

use super::{find_account_by_email, notice_redirect, notice_text, password};

#[derive(Deserialize)]
pub(crate) struct NoticeQuery {
    pub(crate) notice: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn login_page(Query(NoticeQuery { notice }): Query<NoticeQuery>) -> impl IntoResponse {
    Html(
        include_res!(str, "/pages/login.html")
            .replace("{notice}", notice_text(notice.as_deref().unwrap_or(""))),
    )
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(LoginForm { email, password }): Form<LoginForm>,
) -> AppResult<Response> {
    let email = email.trim();
    if !password::validate_email(email) {
        return Ok(notice_redirect("/login", "invalid_email"));
    }

    let Some(account) = find_account_by_email(&db_pool, email).await? else {
        return Ok(notice_redirect("/login", "unknown_email"));
    };
    let Some(hash) = account.password_hash.as_deref() else {
        return Ok(notice_redirect("/login", "oauth_account"));
    };
    if !password::verify(&password, hash) {
        return Ok(notice_redirect("/login", "bad_credentials"));
    }

    session::sign_in(&session, &account.id).await?;
    sqlx::query("UPDATE users SET last_login=? WHERE id=?")
        .bind(db::now())
        .bind(&account.id)
        .execute(&db_pool)
        .await?;

    // the guard decides where a fresh session belongs
    let status = resolver::resolve(&db_pool, Some(&account.id)).await;
    let to = guard::redirect_for(&status, "/login").unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(&to).into_response())
}
