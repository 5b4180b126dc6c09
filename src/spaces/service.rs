//! Visual space store operations. Title uniqueness is enforced per owner
//! with a case-insensitive read-then-write check; two racing creates can
//! both pass the pre-check, which is an accepted weak guarantee.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{self, VisualSpace},
    AppError, AppResult,
};

pub async fn list(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<VisualSpace>> {
    Ok(sqlx::query_as::<_, VisualSpace>(
        "SELECT * FROM visual_spaces WHERE user_id=? ORDER BY last_accessed DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn most_recent(pool: &SqlitePool, user_id: &str) -> AppResult<Option<VisualSpace>> {
    Ok(sqlx::query_as::<_, VisualSpace>(
        "SELECT * FROM visual_spaces WHERE user_id=? ORDER BY last_accessed DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<Option<VisualSpace>> {
    Ok(
        sqlx::query_as::<_, VisualSpace>("SELECT * FROM visual_spaces WHERE id=?")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn title_exists(pool: &SqlitePool, user_id: &str, title: &str) -> AppResult<bool> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM visual_spaces WHERE user_id=? AND title=? COLLATE NOCASE",
    )
    .bind(user_id)
    .bind(title)
    .fetch_one(pool)
    .await?
        > 0)
}

/// Probes `base`, `base (2)`, `base (3)`, … until a free title turns up.
pub async fn suggest_unique_title(pool: &SqlitePool, user_id: &str, base: &str) -> AppResult<String> {
    let mut counter = 1;
    let mut title = base.to_string();

    while title_exists(pool, user_id, &title).await? {
        counter += 1;
        title = format!("{base} ({counter})");
    }

    Ok(title)
}

pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    title: &str,
    description: Option<&str>,
) -> AppResult<VisualSpace> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("a Visual Space needs a title".to_string()));
    }

    if title_exists(pool, user_id, title).await? {
        let alt = suggest_unique_title(pool, user_id, title).await?;
        return Err(AppError::Conflict(format!(
            "A Visual Space with this name already exists. Try \"{alt}\" instead."
        )));
    }

    let id = Uuid::now_v7().to_string();
    let now = db::now();
    sqlx::query(
        "INSERT INTO visual_spaces (id,title,description,user_id,created_at,last_modified,last_accessed)
         VALUES (?,?,?,?,?,?,?)",
    )
    .bind(&id)
    .bind(title)
    .bind(description)
    .bind(user_id)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(VisualSpace {
        id,
        title: title.to_string(),
        description: description.map(str::to_string),
        user_id: user_id.to_string(),
        created_at: now.clone(),
        last_modified: now.clone(),
        last_accessed: now,
    })
}

async fn title_taken_by_other(
    pool: &SqlitePool,
    user_id: &str,
    title: &str,
    own_id: &str,
) -> AppResult<bool> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM visual_spaces WHERE user_id=? AND title=? COLLATE NOCASE AND id<>?",
    )
    .bind(user_id)
    .bind(title)
    .bind(own_id)
    .fetch_one(pool)
    .await?
        > 0)
}

/// Renames a space under the same per-owner uniqueness rule as `create`.
/// The space itself is excluded from the check, so changing only the
/// casing of a title goes through.
pub async fn rename(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
    title: &str,
) -> AppResult<VisualSpace> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("a Visual Space needs a title".to_string()));
    }

    let Some(space) = get(pool, id).await?.filter(|s| s.user_id == user_id) else {
        return Err(AppError::NotFound("space"));
    };

    if title_taken_by_other(pool, user_id, title, id).await? {
        let alt = suggest_unique_title(pool, user_id, title).await?;
        return Err(AppError::Conflict(format!(
            "A Visual Space with this name already exists. Try \"{alt}\" instead."
        )));
    }

    let now = db::now();
    sqlx::query("UPDATE visual_spaces SET title=?, last_modified=? WHERE id=? AND user_id=?")
        .bind(title)
        .bind(&now)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(VisualSpace {
        title: title.to_string(),
        last_modified: now,
        ..space
    })
}

/// Selecting a space bumps it to the front of the recency ordering.
pub async fn touch(pool: &SqlitePool, id: &str) -> AppResult<()> {
    sqlx::query("UPDATE visual_spaces SET last_accessed=? WHERE id=?")
        .bind(db::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Deletes the space and returns the next most-recently-accessed remaining
/// space, or `None` when the owner has none left.
pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<Option<VisualSpace>> {
    sqlx::query("DELETE FROM visual_spaces WHERE id=? AND user_id=?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    most_recent(pool, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with_owner(user_id: &str) -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        db::init_db(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id,email,username,first_name,last_name,is_active,created_at,updated_at)
             VALUES (?,?,?,?,?,1,?,?)",
        )
        .bind(user_id)
        .bind(format!("{user_id}@example.com"))
        .bind(user_id)
        .bind("First")
        .bind("Last")
        .bind(db::now())
        .bind(db::now())
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    async fn set_last_accessed(pool: &SqlitePool, id: &str, stamp: &str) {
        sqlx::query("UPDATE visual_spaces SET last_accessed=? WHERE id=?")
            .bind(stamp)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_title_is_rejected_with_a_suggestion() {
        let pool = pool_with_owner("u1").await;
        create(&pool, "u1", "Notes", None).await.unwrap();

        let err = create(&pool, "u1", "Notes", None).await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert!(msg.contains("\"Notes (2)\""), "unexpected: {msg}"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn title_collision_is_case_insensitive_and_per_owner() {
        let pool = pool_with_owner("u1").await;
        sqlx::query(
            "INSERT INTO users (id,email,username,first_name,last_name,is_active,created_at,updated_at)
             VALUES ('u2','u2@example.com','u2','F','L',1,?,?)",
        )
        .bind(db::now())
        .bind(db::now())
        .execute(&pool)
        .await
        .unwrap();

        create(&pool, "u1", "Notes", None).await.unwrap();
        assert!(matches!(
            create(&pool, "u1", "nOtEs", None).await,
            Err(AppError::Conflict(_))
        ));
        // a different owner may reuse the title
        create(&pool, "u2", "Notes", None).await.unwrap();
    }

    #[tokio::test]
    async fn suggestion_skips_every_taken_candidate() {
        let pool = pool_with_owner("u1").await;
        create(&pool, "u1", "Notes", None).await.unwrap();
        create(&pool, "u1", "Notes (2)", None).await.unwrap();

        let suggested = suggest_unique_title(&pool, "u1", "Notes").await.unwrap();
        assert_eq!(suggested, "Notes (3)");
    }

    #[tokio::test]
    async fn free_base_title_is_suggested_unchanged() {
        let pool = pool_with_owner("u1").await;
        let suggested = suggest_unique_title(&pool, "u1", "Notes").await.unwrap();
        assert_eq!(suggested, "Notes");
    }

    #[tokio::test]
    async fn rename_updates_the_title_and_bumps_last_modified() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "Notes", None).await.unwrap();
        sqlx::query("UPDATE visual_spaces SET last_modified='2026-01-01T00:00:00.000000Z' WHERE id=?")
            .bind(&a.id)
            .execute(&pool)
            .await
            .unwrap();

        let renamed = rename(&pool, "u1", &a.id, "Journal").await.unwrap();
        assert_eq!(renamed.title, "Journal");
        assert!(renamed.last_modified.as_str() > "2026-01-01T00:00:00.000000Z");

        let stored = get(&pool, &a.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Journal");
        assert_eq!(stored.last_modified, renamed.last_modified);
    }

    #[tokio::test]
    async fn rename_to_a_taken_title_is_rejected_with_a_suggestion() {
        let pool = pool_with_owner("u1").await;
        create(&pool, "u1", "Notes", None).await.unwrap();
        let b = create(&pool, "u1", "Journal", None).await.unwrap();

        let err = rename(&pool, "u1", &b.id, "nOtEs").await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert!(msg.contains("\"nOtEs (2)\""), "unexpected: {msg}"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_may_change_only_the_casing_of_its_own_title() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "Notes", None).await.unwrap();

        let renamed = rename(&pool, "u1", &a.id, "NOTES").await.unwrap();
        assert_eq!(renamed.title, "NOTES");
    }

    #[tokio::test]
    async fn rename_of_another_owners_space_is_not_found() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "Notes", None).await.unwrap();

        assert!(matches!(
            rename(&pool, "intruder", &a.id, "Mine now").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(get(&pool, &a.id).await.unwrap().unwrap().title, "Notes");
    }

    #[tokio::test]
    async fn list_orders_by_recency_and_touch_reorders() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "A", None).await.unwrap();
        let b = create(&pool, "u1", "B", None).await.unwrap();
        set_last_accessed(&pool, &a.id, "2026-01-01T00:00:00.000000Z").await;
        set_last_accessed(&pool, &b.id, "2026-01-02T00:00:00.000000Z").await;

        let titles: Vec<String> = list(&pool, "u1").await.unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["B", "A"]);

        touch(&pool, &a.id).await.unwrap();
        let titles: Vec<String> = list(&pool, "u1").await.unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn deleting_the_open_space_falls_back_to_the_next_most_recent() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "A", None).await.unwrap();
        let b = create(&pool, "u1", "B", None).await.unwrap();
        let c = create(&pool, "u1", "C", None).await.unwrap();
        set_last_accessed(&pool, &a.id, "2026-01-01T00:00:00.000000Z").await;
        set_last_accessed(&pool, &b.id, "2026-01-02T00:00:00.000000Z").await;
        set_last_accessed(&pool, &c.id, "2026-01-03T00:00:00.000000Z").await;

        // c is the open (most recent) space; b is next in line
        let next = delete(&pool, "u1", &c.id).await.unwrap().unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn deleting_the_last_space_leaves_no_selection() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "A", None).await.unwrap();

        assert!(delete(&pool, "u1", &a.id).await.unwrap().is_none());
        assert!(list(&pool, "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_ignores_spaces_of_other_owners() {
        let pool = pool_with_owner("u1").await;
        let a = create(&pool, "u1", "A", None).await.unwrap();

        delete(&pool, "someone-else", &a.id).await.unwrap();
        assert!(get(&pool, &a.id).await.unwrap().is_some());
    }
}
