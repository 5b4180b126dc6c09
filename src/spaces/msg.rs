use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{self, ChatMessage},
    include_res, AppResult,
};

use super::SpaceChannels;

/// Inbound WebSocket frame payload.
#[derive(Deserialize)]
pub(crate) struct SendMessage {
    pub(crate) content: String,
}

/// Persists the message, then publishes it through the space's channel.
/// The sender gets it back over the same subscription; there is no
/// optimistic local copy.
pub(crate) async fn send_msg(
    pool: &SqlitePool,
    channels: &SpaceChannels,
    space_id: &str,
    user_id: &str,
    username: &str,
    SendMessage { content }: SendMessage,
) -> AppResult<()> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(());
    }

    let id = Uuid::now_v7().to_string();
    let created_at = db::now();

    sqlx::query(
        "INSERT INTO chat_messages (id,visual_space_id,user_id,username,content,created_at)
         VALUES (?,?,?,?,?,?)",
    )
    .bind(&id)
    .bind(space_id)
    .bind(user_id)
    .bind(username)
    .bind(content)
    .bind(&created_at)
    .execute(pool)
    .await?;

    channels.publish(
        space_id,
        render_message(&ChatMessage {
            id,
            visual_space_id: space_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            content: content.to_string(),
            created_at,
        }),
    );

    Ok(())
}

/// Full history for a space, oldest first.
pub(crate) async fn history_html(pool: &SqlitePool, space_id: &str) -> AppResult<String> {
    let messages = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE visual_space_id=? ORDER BY created_at ASC",
    )
    .bind(space_id)
    .fetch_all(pool)
    .await?;

    Ok(messages.iter().map(render_message).collect())
}

fn render_message(message: &ChatMessage) -> String {
    // raw HTML inside the markdown is demoted to text so it renders inert
    let events = pulldown_cmark::Parser::new(&message.content).map(|event| match event {
        pulldown_cmark::Event::Html(raw) | pulldown_cmark::Event::InlineHtml(raw) => {
            pulldown_cmark::Event::Text(raw)
        }
        event => event,
    });
    let mut content_html = String::new();
    pulldown_cmark::html::push_html(&mut content_html, events);

    let mut username_html = String::new();
    // writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut username_html, &message.username);

    include_res!(str, "/pages/message.html")
        .replace("{id}", &message.id)
        .replace("{username}", &username_html)
        .replace("{user_id}", &message.user_id)
        .replace("{created_at}", &message.created_at)
        .replace("{content}", &content_html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    async fn pool_with_space(space_id: &str) -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        db::init_db(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id,email,username,first_name,last_name,is_active,created_at,updated_at)
             VALUES ('u1','u1@example.com','alice','A','B',1,?,?)",
        )
        .bind(db::now())
        .bind(db::now())
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO visual_spaces (id,title,user_id,created_at,last_modified,last_accessed)
             VALUES (?,'Test','u1',?,?,?)",
        )
        .bind(space_id)
        .bind(db::now())
        .bind(db::now())
        .bind(db::now())
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn sent_message_is_persisted_and_broadcast_to_its_space() {
        let pool = pool_with_space("s1").await;
        let channels = SpaceChannels::default();
        let mut rx = channels.subscribe("s1");

        send_msg(
            &pool,
            &channels,
            "s1",
            "u1",
            "alice",
            SendMessage {
                content: "hello there".to_string(),
            },
        )
        .await
        .unwrap();

        let pushed = rx.recv().await.unwrap();
        assert!(pushed.contains("hello there"));
        assert!(pushed.contains("alice"));

        let history = history_html(&pool, "s1").await.unwrap();
        assert!(history.contains("hello there"));
    }

    #[tokio::test]
    async fn message_for_one_space_never_reaches_another() {
        let pool = pool_with_space("s1").await;
        let channels = SpaceChannels::default();
        let mut rx_other = channels.subscribe("s2");

        send_msg(
            &pool,
            &channels,
            "s1",
            "u1",
            "alice",
            SendMessage {
                content: "scoped".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(matches!(rx_other.try_recv(), Err(TryRecvError::Empty)));
        assert!(history_html(&pool, "s2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_messages_are_dropped() {
        let pool = pool_with_space("s1").await;
        let channels = SpaceChannels::default();
        let mut rx = channels.subscribe("s1");

        send_msg(
            &pool,
            &channels,
            "s1",
            "u1",
            "alice",
            SendMessage {
                content: "   ".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(history_html(&pool, "s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn raw_html_in_a_message_renders_inert() {
        let pool = pool_with_space("s1").await;
        let channels = SpaceChannels::default();
        let mut rx = channels.subscribe("s1");

        send_msg(
            &pool,
            &channels,
            "s1",
            "u1",
            "alice",
            SendMessage {
                content: "<script>alert(1)</script>".to_string(),
            },
        )
        .await
        .unwrap();

        let pushed = rx.recv().await.unwrap();
        assert!(!pushed.contains("<script>"), "unexpected: {pushed}");
        assert!(pushed.contains("&lt;script&gt;"));

        let history = history_html(&pool, "s1").await.unwrap();
        assert!(!history.contains("<script>"));
    }

    #[test]
    fn usernames_are_escaped_when_rendered() {
        let html = render_message(&ChatMessage {
            id: "m1".to_string(),
            visual_space_id: "s1".to_string(),
            user_id: "u1".to_string(),
            username: "<b>eve</b>".to_string(),
            content: "hi".to_string(),
            created_at: db::now(),
        });
        assert!(!html.contains("<b>eve</b>"));
        assert!(html.contains("&lt;b&gt;eve&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn history_is_ordered_oldest_first() {
        let pool = pool_with_space("s1").await;
        for (i, stamp) in ["2026-01-02T00:00:00.000000Z", "2026-01-01T00:00:00.000000Z"]
            .into_iter()
            .enumerate()
        {
            sqlx::query(
                "INSERT INTO chat_messages (id,visual_space_id,user_id,username,content,created_at)
                 VALUES (?,'s1','u1','alice',?,?)",
            )
            .bind(format!("m{i}"))
            .bind(format!("message {i}"))
            .bind(stamp)
            .execute(&pool)
            .await
            .unwrap();
        }

        let history = history_html(&pool, "s1").await.unwrap();
        let first = history.find("message 1").unwrap();
        let second = history.find("message 0").unwrap();
        assert!(first < second, "older message should render first");
    }
}
