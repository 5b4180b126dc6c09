use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session, AppResult};

use super::level2;

#[derive(Deserialize)]
pub(crate) struct CheckQuery {
    username: String,
}

#[derive(Serialize)]
pub(crate) struct Availability {
    available: bool,
}

pub(crate) async fn availability(pool: &SqlitePool, me: &str, username: &str) -> AppResult<bool> {
    let username = username.trim();
    if username.is_empty() {
        return Ok(false);
    }

    Ok(!level2::username_taken(pool, me, username).await?)
}

/// Backs the debounced client-side uniqueness probe. The submit path
/// re-checks server-side regardless.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn check_username(
    Query(CheckQuery { username }): Query<CheckQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Availability>> {
    let me = session::current_user(&session).await?.unwrap_or_default();
    let available = availability(&db_pool, &me, &username).await?;
    Ok(Json(Availability { available }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn pool_with_user(username: &str) -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        db::init_db(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id,email,username,first_name,last_name,is_active,created_at,updated_at)
             VALUES ('u1','u1@example.com',?,'A','B',1,?,?)",
        )
        .bind(username)
        .bind(db::now())
        .bind(db::now())
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn free_username_is_available() {
        let pool = pool_with_user("alice").await;
        assert!(availability(&pool, "u2", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn taken_username_is_unavailable_regardless_of_case() {
        let pool = pool_with_user("alice").await;
        assert!(!availability(&pool, "u2", "ALICE").await.unwrap());
    }

    #[tokio::test]
    async fn blank_username_is_never_available() {
        let pool = pool_with_user("alice").await;
        assert!(!availability(&pool, "u2", "   ").await.unwrap());
    }

    #[tokio::test]
    async fn own_username_stays_available_to_its_owner() {
        let pool = pool_with_user("alice").await;
        assert!(availability(&pool, "u1", "alice").await.unwrap());
    }
}
