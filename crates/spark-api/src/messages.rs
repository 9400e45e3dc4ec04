use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use spark_types::api::{Claims, MarkReadResponse, SendMessageRequest};
use spark_types::events::GatewayEvent;
use spark_types::models::DeliveryStatus;

use crate::error::ApiError;
use crate::state::AppState;

const MAX_CONTENT_LEN: usize = 4000;

/// Chat access errors collapse to `Forbidden`: a match that was torn down and
/// a match the caller never belonged to look the same from outside — chat is
/// locked either way.
fn chat_access(err: spark_db::StoreError) -> ApiError {
    match err {
        spark_db::StoreError::NotFound | spark_db::StoreError::NotParticipant => {
            ApiError::Forbidden
        }
        other => other.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the id of the oldest message from the
    /// previous page to fetch older history.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

/// Send a chat message. Persisting always wins: the message is durable with
/// status `sent` before any live push is attempted. A reachable recipient
/// upgrades it to `delivered` optimistically; an offline one picks it up on
/// the next fetch. Push failure is never an error.
pub async fn send_message(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender_id = claims.sub;

    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Invalid("message content is empty".into()));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(ApiError::Invalid("message content too long".into()));
    }
    let content = content.to_string();

    let db = state.db.clone();
    let (mut message, recipient) = tokio::task::spawn_blocking(move || {
        let message = db.insert_message(match_id, sender_id, &content)?;
        let m = db
            .get_match(match_id)?
            .ok_or(spark_db::StoreError::NotFound)?;
        let recipient = m
            .other_participant(sender_id)
            .ok_or(spark_db::StoreError::NotParticipant)?;
        Ok::<_, spark_db::StoreError>((message, recipient))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))?
    .map_err(chat_access)?;

    let delivered = state
        .registry
        .send_to_user(
            recipient,
            GatewayEvent::Message {
                message: message.clone(),
            },
        )
        .await;

    if delivered {
        let db = state.db.clone();
        let message_id = message.id;
        tokio::task::spawn_blocking(move || db.mark_delivered(message_id))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))?
            .map_err(chat_access)?;
        message.status = DeliveryStatus::Delivered;
    }

    Ok((StatusCode::CREATED, Json(message)))
}

/// Page of chat history for a participant, oldest-first. Fetching doubles as
/// the delivery acknowledgement for the counterpart's pending messages.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = claims.sub;
    let limit = query.limit.min(200);
    let before = query.before;

    let db = state.db.clone();
    let messages = tokio::task::spawn_blocking(move || {
        db.get_messages(match_id, viewer_id, limit, before.as_deref())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))?
    .map_err(chat_access)?;

    Ok(Json(messages))
}

/// Mark the counterpart's messages read. Monotonic and idempotent; reports
/// how many messages actually transitioned. The counterpart, if online, gets
/// a read receipt push.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let reader_id = claims.sub;

    let db = state.db.clone();
    let (count, counterpart) = tokio::task::spawn_blocking(move || {
        let count = db.mark_read(match_id, reader_id)?;
        let counterpart = db
            .get_match(match_id)?
            .and_then(|m| m.other_participant(reader_id));
        Ok::<_, spark_db::StoreError>((count, counterpart))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))?
    .map_err(chat_access)?;

    if count > 0 {
        if let Some(counterpart) = counterpart {
            state
                .registry
                .send_to_user(counterpart, GatewayEvent::Read { match_id, reader_id })
                .await;
        }
    }

    Ok(Json(MarkReadResponse { count }))
}
