use axum::{
    debug_handler,
    extract::{Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{session, AppError, AppResult};

use super::{msg, service, SpaceChannels};

/// Realtime subscription for one space. Torn down when the socket closes,
/// so a remount against another space id starts from a fresh subscription
/// and never sees the old space's inserts.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn space_ws(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(channels): State<SpaceChannels>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Err(AppError::Unauthorized);
    };

    let Some(space) = service::get(&db_pool, &id.to_string()).await? else {
        return Err(AppError::NotFound("space"));
    };
    if space.user_id != user_id {
        return Err(AppError::NotFound("space"));
    }

    let username: Option<(Option<String>,)> =
        sqlx::query_as("SELECT username FROM users WHERE id=?")
            .bind(&user_id)
            .fetch_optional(&db_pool)
            .await?;
    let Some(username) = username.and_then(|(u,)| u).filter(|u| !u.is_empty()) else {
        return Err(AppError::Unauthorized);
    };

    let space_id = space.id;
    Ok(ws
        .on_upgrade(move |stream| async move {
            let mut rx = channels.subscribe(&space_id);
            let (mut sender, mut receiver) = stream.split();

            let mut push_task = tokio::spawn(async move {
                while let Ok(payload) = rx.recv().await {
                    if sender.send(payload.into()).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    _ = &mut push_task => break,
                    inbound = receiver.next() => {
                        let Some(Ok(frame)) = inbound else { break };
                        let Ok(send) = serde_json::from_slice::<msg::SendMessage>(&frame.into_data()) else {
                            continue;
                        };
                        if let Err(e) =
                            msg::send_msg(&db_pool, &channels, &space_id, &user_id, &username, send).await
                        {
                            tracing::error!("failed to store chat message: {e:#}");
                        }
                    }
                }
            }

            push_task.abort();
            // the push task holds the broadcast receiver until it has fully
            // wound down; release before that sees a phantom subscriber
            let _ = push_task.await;
            channels.release(&space_id);
        })
        .into_response())
}
