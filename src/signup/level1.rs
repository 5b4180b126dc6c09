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
    auth::{self, password},
    include_res, session, AppResult,
};

#[derive(Deserialize)]
pub(crate) struct NoticeQuery {
    pub(crate) notice: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct Level1Form {
    email: String,
    password: String,
    confirm_password: String,
}

#[debug_handler]
pub(crate) async fn page(Query(NoticeQuery { notice }): Query<NoticeQuery>) -> impl IntoResponse {
    Html(
        include_res!(str, "/pages/signup.html")
            .replace("{notice}", auth::notice_text(notice.as_deref().unwrap_or(""))),
    )
}

/// Credentials step. Validation failures stay on this step; an email that
/// is already registered routes to login instead of retrying.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(Level1Form {
        email,
        password,
        confirm_password,
    }): Form<Level1Form>,
) -> AppResult<Response> {
    let email = email.trim();

    if !password::validate_email(email) {
        return Ok(auth::notice_redirect("/signup", "invalid_email"));
    }
    if password::validate_policy(&password).is_err() {
        return Ok(auth::notice_redirect("/signup", "weak_password"));
    }
    if password != confirm_password {
        return Ok(auth::notice_redirect("/signup", "password_mismatch"));
    }

    if auth::find_account_by_email(&db_pool, email).await?.is_some() {
        return Ok(auth::notice_redirect("/login", "already_registered"));
    }

    let hash = password::hash(&password)?;
    let account_id = auth::create_account(&db_pool, email, Some(&hash), "email").await?;
    session::sign_in(&session, &account_id).await?;

    Ok(Redirect::to("/signup/level2").into_response())
}
