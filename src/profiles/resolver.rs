use sqlx::SqlitePool;
use tracing::warn;

use crate::db::UserProfile;

/// What the current session amounts to, profile-wise. Read-only; callers
/// act on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStatus {
    Unauthenticated,
    NoProfile,
    Incomplete,
    Complete { username: String },
}

/// Store failures fail closed to `Unauthenticated`; the guard simply runs
/// again on the next navigation.
pub async fn resolve(pool: &SqlitePool, account_id: Option<&str>) -> ProfileStatus {
    let Some(account_id) = account_id else {
        return ProfileStatus::Unauthenticated;
    };

    let profile = sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id=?")
        .bind(account_id)
        .fetch_optional(pool)
        .await;

    match profile {
        Ok(None) => ProfileStatus::NoProfile,
        Ok(Some(profile)) if profile.is_complete() => ProfileStatus::Complete {
            username: profile.username.unwrap_or_default(),
        },
        Ok(Some(_)) => ProfileStatus::Incomplete,
        Err(e) => {
            warn!("profile lookup failed, treating session as unauthenticated: {e}");
            ProfileStatus::Unauthenticated
        }
    }
}
