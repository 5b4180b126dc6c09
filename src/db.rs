use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

/// RFC 3339 UTC timestamp with fixed precision, so that string ordering in
/// the store matches chronological ordering.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Profile record in the `users` table, keyed by the account id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub description: Option<String>,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

impl UserProfile {
    /// A profile counts as complete once the username and the required
    /// personal fields are set.
    pub fn is_complete(&self) -> bool {
        fn filled(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.trim().is_empty())
        }

        filled(&self.username) && filled(&self.first_name) && filled(&self.last_name)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisualSpace {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub last_modified: String,
    pub last_accessed: String,
}

/// Append-only; rows are never updated after insert.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: String,
    pub visual_space_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub created_at: String,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT,
    provider TEXT NOT NULL DEFAULT 'email',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    username TEXT UNIQUE COLLATE NOCASE,
    first_name TEXT,
    last_name TEXT,
    description TEXT,
    profile_image TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_login TEXT
);

CREATE TABLE IF NOT EXISTS visual_spaces (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    last_accessed TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spaces_owner ON visual_spaces (user_id, last_accessed);

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    visual_space_id TEXT NOT NULL REFERENCES visual_spaces(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    username TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_space ON chat_messages (visual_space_id, created_at);
"#;

pub async fn init_db(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
