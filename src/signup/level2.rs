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
    auth, db, include_res, session, spaces,
    storage, AppError, AppResult, Config,
};

use super::level1::NoticeQuery;

#[derive(Deserialize)]
pub(crate) struct Level2Form {
    username: String,
    first_name: String,
    last_name: String,
    description: String,
    /// Optional photo as a base64 data URL, captured client-side.
    #[serde(default)]
    photo: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn page(
    Query(NoticeQuery { notice }): Query<NoticeQuery>,
    session: Session,
) -> AppResult<Response> {
    if session::current_user(&session).await?.is_none() {
        return Ok(auth::notice_redirect("/login", "signin_required"));
    }

    Ok(Html(
        include_res!(str, "/pages/signup_level2.html")
            .replace("{notice}", auth::notice_text(notice.as_deref().unwrap_or(""))),
    )
    .into_response())
}

/// Profile step. On success the user lands in their freshly ensured first
/// space; on any store failure the step does not advance and may be
/// retried.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit(
    State(db_pool): State<SqlitePool>,
    State(config): State<Config>,
    session: Session,
    Form(form): Form<Level2Form>,
) -> AppResult<Response> {
    let Some(account_id) = session::current_user(&session).await? else {
        return Ok(auth::notice_redirect("/login", "signin_required"));
    };

    let username = form.username.trim().to_string();
    let first_name = form.first_name.trim().to_string();
    let last_name = form.last_name.trim().to_string();
    let description = form.description.trim().to_string();

    if username.is_empty() || first_name.is_empty() || last_name.is_empty() || description.is_empty() {
        return Ok(auth::notice_redirect("/signup/level2", "missing_fields"));
    }

    let email: Option<String> = sqlx::query_scalar("SELECT email FROM accounts WHERE id=?")
        .bind(&account_id)
        .fetch_optional(&db_pool)
        .await?;
    let Some(email) = email else {
        // session refers to an account that no longer exists
        session.clear().await;
        return Ok(auth::notice_redirect("/login", "signin_required"));
    };

    let photo_url = if form.photo.is_empty() {
        None
    } else {
        Some(storage::store_data_url(&config.uploads_dir, &account_id, &form.photo).await?)
    };

    let profile = ProfileForm {
        username: &username,
        first_name: &first_name,
        last_name: &last_name,
        description: &description,
        photo_url: photo_url.as_deref(),
    };

    match complete_signup(&db_pool, &account_id, &email, &profile).await {
        Ok(space) => Ok(Redirect::to(&format!("/space/{}", space.id)).into_response()),
        Err(AppError::Conflict(_)) => Ok(auth::notice_redirect("/signup/level2", "username_taken")),
        Err(e) => Err(e),
    }
}

pub(crate) struct ProfileForm<'a> {
    pub(crate) username: &'a str,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) description: &'a str,
    pub(crate) photo_url: Option<&'a str>,
}

/// Upserts the profile, then makes sure the account owns its initial
/// space. Profile and space are two separate writes with no transaction;
/// re-entry after a partial failure reuses whatever space already exists
/// instead of creating a duplicate.
pub(crate) async fn complete_signup(
    pool: &SqlitePool,
    account_id: &str,
    email: &str,
    form: &ProfileForm<'_>,
) -> AppResult<crate::db::VisualSpace> {
    if username_taken(pool, account_id, form.username).await? {
        return Err(AppError::Conflict("username already taken".to_string()));
    }

    let now = db::now();
    sqlx::query(
        "INSERT INTO users (id,email,username,first_name,last_name,description,profile_image,is_active,created_at,updated_at,last_login)
         VALUES (?,?,?,?,?,?,?,1,?,?,?)
         ON CONFLICT(id) DO UPDATE SET
             username=excluded.username,
             first_name=excluded.first_name,
             last_name=excluded.last_name,
             description=excluded.description,
             profile_image=COALESCE(excluded.profile_image, users.profile_image),
             updated_at=excluded.updated_at",
    )
    .bind(account_id)
    .bind(email)
    .bind(form.username)
    .bind(form.first_name)
    .bind(form.last_name)
    .bind(form.description)
    .bind(form.photo_url)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    if let Some(space) = spaces::service::most_recent(pool, account_id).await? {
        return Ok(space);
    }

    spaces::service::create(
        pool,
        account_id,
        &format!("{}'s Space", form.username),
        Some("My first personal visual space"),
    )
    .await
}

/// Case-insensitive, excluding the caller's own (possibly partial) row so
/// retrying a failed submit with the same username still passes.
pub(crate) async fn username_taken(
    pool: &SqlitePool,
    account_id: &str,
    username: &str,
) -> AppResult<bool> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE username=? COLLATE NOCASE AND id<>?",
    )
    .bind(username)
    .bind(account_id)
    .fetch_one(pool)
    .await?
        > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        db::init_db(&pool).await.unwrap();
        pool
    }

    fn form(username: &str) -> ProfileForm<'_> {
        ProfileForm {
            username,
            first_name: "First",
            last_name: "Last",
            description: "about me",
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn completing_signup_creates_the_initial_space() {
        let pool = pool().await;
        let space = complete_signup(&pool, "acc-1", "a@example.com", &form("alice"))
            .await
            .unwrap();

        assert_eq!(space.title, "alice's Space");
        assert_eq!(space.user_id, "acc-1");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visual_spaces WHERE user_id='acc-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn reentry_reuses_the_existing_space() {
        let pool = pool().await;
        let first = complete_signup(&pool, "acc-1", "a@example.com", &form("alice"))
            .await
            .unwrap();
        let second = complete_signup(&pool, "acc-1", "a@example.com", &form("alice"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visual_spaces WHERE user_id='acc-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let pool = pool().await;
        complete_signup(&pool, "acc-1", "a@example.com", &form("alice"))
            .await
            .unwrap();

        let err = complete_signup(&pool, "acc-2", "b@example.com", &form("ALICE"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn own_partial_row_does_not_block_a_retry() {
        let pool = pool().await;
        complete_signup(&pool, "acc-1", "a@example.com", &form("alice"))
            .await
            .unwrap();

        assert!(!username_taken(&pool, "acc-1", "alice").await.unwrap());
        assert!(username_taken(&pool, "acc-2", "alice").await.unwrap());
    }
}
