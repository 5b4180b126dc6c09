mod callback;
mod clients;
mod login;
mod logout;
mod oauth;
pub mod password;

pub use clients::{ClientProvider, Clients};

use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", get(logout::logout))
        .route("/oauth/{provider}", get(oauth::authorize))
        .route("/oauth/{provider}/callback", get(callback::callback))
}

/// Auth identity. The profile row in `users` shares this id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: String,
}

pub(crate) async fn find_account_by_email(
    pool: &SqlitePool,
    email: &str,
) -> AppResult<Option<Account>> {
    Ok(sqlx::query_as::<_, Account>(
        "SELECT id,email,password_hash,provider FROM accounts WHERE email=? COLLATE NOCASE",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?)
}

pub(crate) async fn create_account(
    pool: &SqlitePool,
    email: &str,
    password_hash: Option<&str>,
    provider: &str,
) -> AppResult<String> {
    let id = Uuid::now_v7().to_string();

    sqlx::query("INSERT INTO accounts (id,email,password_hash,provider,created_at) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(provider)
        .bind(db::now())
        .execute(pool)
        .await?;

    tracing::info!("created {provider} account for {email}");
    Ok(id)
}

/// Post/redirect/get with a short notice code the target page turns back
/// into text; keeps user-facing failures out of raw error responses.
pub(crate) fn notice_redirect(path: &str, code: &str) -> Response {
    Redirect::to(&format!("{path}?notice={code}")).into_response()
}

pub(crate) fn notice_text(code: &str) -> &'static str {
    match code {
        "already_registered" => "An account already exists with this email. Please sign in.",
        "unknown_email" => "No account found for this email.",
        "bad_credentials" => "Email or password is incorrect.",
        "oauth_account" => "This account signs in with Google or GitHub.",
        "invalid_email" => "Please enter a valid email address.",
        "weak_password" => {
            "Password must be at least 8 characters and contain uppercase, lowercase, \
             number and special character."
        }
        "password_mismatch" => "Passwords do not match.",
        "missing_fields" => "Please complete all required fields.",
        "username_taken" => "Username already taken.",
        "signin_required" => "Please sign in to continue.",
        "no_email" => "Your identity provider did not share an email address.",
        _ => "",
    }
}
