use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{SubsecRound, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use solace_db::queries::format_timestamp;
use solace_types::api::{Claims, SendMessageRequest};
use solace_types::models::{ChatMessage, PeerSummary, RawMessage};

use crate::directory::{message_from_row, parse_timestamp, profile_from_row};
use crate::error::ApiError;
use crate::state::AppState;

pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: pass the `timestamp` of the oldest message
    /// from the previous page to fetch older messages.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

/// Everyone the caller has exchanged messages with.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PeerSummary>>, ApiError> {
    let db = state.clone();
    let id = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_conversation_partners(&id)).await??;

    let summaries = rows
        .into_iter()
        .filter_map(profile_from_row)
        .map(|p| state.transformer.to_peer_summary(&p))
        .collect();

    Ok(Json(summaries))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(peer_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let db = state.clone();
    let me = claims.sub.to_string();
    let peer = peer_id.to_string();
    let limit = query.limit.clamp(1, 200);
    // Re-encode the cursor so it compares correctly against stored timestamps.
    let before = match query.before.as_deref() {
        Some(raw) => Some(
            parse_timestamp(raw)
                .map(format_timestamp)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid cursor '{}'", raw)))?,
        ),
        None => None,
    };

    let (peer_row, rows) = tokio::task::spawn_blocking(move || {
        let peer_row = db.db.get_profile(&peer)?;
        let rows = db.db.get_conversation(&me, &peer, limit, before.as_deref())?;
        Ok::<_, anyhow::Error>((peer_row, rows))
    })
    .await??;

    let peer_profile = peer_row.and_then(profile_from_row).ok_or(ApiError::NotFound("peer"))?;

    let messages = rows
        .into_iter()
        .map(message_from_row)
        .map(|msg| state.transformer.format_chat_message(&msg, claims.sub, &peer_profile))
        .collect();

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(peer_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if peer_id == claims.sub {
        return Err(ApiError::BadRequest("cannot message yourself".into()));
    }
    let content = req.content.trim().to_string();
    let len = content.chars().count();
    if len == 0 || len > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "content must be 1-{} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let message = RawMessage {
        id: Uuid::new_v4(),
        sender_id: claims.sub,
        recipient_id: peer_id,
        content,
        // Stored timestamps keep microseconds; match them in the response.
        created_at: Utc::now().trunc_subsecs(6),
    };

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let stored = message.clone();
    let (sender_row, peer_row) = tokio::task::spawn_blocking(move || {
        let sender = stored.sender_id.to_string();
        let peer = stored.recipient_id.to_string();
        let sender_row = db.db.get_profile(&sender)?;
        let peer_row = db.db.get_profile(&peer)?;
        if sender_row.is_some() && peer_row.is_some() {
            let created_at = format_timestamp(stored.created_at);
            db.db.insert_message(&stored.id.to_string(), &sender, &peer, &stored.content, &created_at)?;
            db.db.touch_last_active(&sender, &created_at)?;
        }
        Ok::<_, anyhow::Error>((sender_row, peer_row))
    })
    .await??;

    if sender_row.is_none() {
        return Err(ApiError::BadRequest("complete your profile before messaging".into()));
    }
    let peer_profile = peer_row.and_then(profile_from_row).ok_or(ApiError::NotFound("peer"))?;

    info!(sender_id = %claims.sub, recipient_id = %peer_id, "Message sent");

    Ok((
        StatusCode::CREATED,
        Json(state.transformer.format_chat_message(&message, claims.sub, &peer_profile)),
    ))
}
