//! SQLite-backed implementations of the matcher's profile-read and
//! peer-listing services, plus the row → record conversions they share
//! with the handlers.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use solace_db::models::{MessageRow, ProfileRow};
use solace_matching::{PeerListing, PeerQuery, PeerSource, ProfileSource, SourceError};
use solace_types::models::{RawMessage, RawProfile, SupportRole};

use crate::state::AppState;

#[derive(Clone)]
pub struct DbDirectory {
    state: AppState,
}

impl DbDirectory {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl ProfileSource for DbDirectory {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<RawProfile>, SourceError> {
        let state = self.state.clone();
        let row = tokio::task::spawn_blocking(move || state.db.get_profile(&user_id.to_string()))
            .await
            .map_err(|e| SourceError::Unavailable(format!("spawn_blocking join error: {}", e)))?
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(row.and_then(profile_from_row))
    }
}

impl PeerSource for DbDirectory {
    /// Pages through the store until `peer_fetch_limit` candidates pass the
    /// query, so older peers that share a journey are not cut off by newer
    /// ones that don't.
    async fn list_peers(&self, viewer_id: Uuid, query: &PeerQuery) -> Result<PeerListing, SourceError> {
        let state = self.state.clone();
        let query = query.clone();

        let (peers, viewer_row) = tokio::task::spawn_blocking(move || {
            let vid = viewer_id.to_string();
            let role = query.support_type.map(SupportRole::as_str);
            let limit = state.peer_fetch_limit;
            let window = state.defaults.active_window;
            let now = Utc::now();

            let mut peers = Vec::new();
            let mut offset = 0u32;
            loop {
                let page = state.db.list_peer_profiles(&vid, role, limit, offset)?;
                let exhausted = page.len() < limit as usize;
                peers.extend(
                    page.into_iter()
                        .filter_map(profile_from_row)
                        .filter(|p| query.admits(p, now, window)),
                );
                if exhausted || peers.len() >= limit as usize {
                    break;
                }
                offset = offset.saturating_add(limit);
            }
            peers.truncate(limit as usize);

            let viewer = if query.include_viewer {
                state.db.get_profile(&vid)?
            } else {
                None
            };
            Ok::<_, anyhow::Error>((peers, viewer))
        })
        .await
        .map_err(|e| SourceError::Unavailable(format!("spawn_blocking join error: {}", e)))?
        .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(PeerListing {
            peers,
            viewer: viewer_row.and_then(profile_from_row),
        })
    }
}

/// Rows with an unreadable id are dropped; every other corrupt column is
/// logged and defaulted.
pub fn profile_from_row(row: ProfileRow) -> Option<RawProfile> {
    let id = match row.id.parse::<Uuid>() {
        Ok(id) => id,
        Err(e) => {
            warn!("Corrupt profile id '{}': {}", row.id, e);
            return None;
        }
    };

    let support_preferences = match serde_json::from_str::<Vec<Value>>(&row.support_preferences) {
        Ok(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!("Corrupt support_preferences on profile '{}': {}", row.id, e);
            Vec::new()
        }
    };

    let support_type = row.support_type.as_deref().and_then(|s| match s.parse::<SupportRole>() {
        Ok(role) => Some(role),
        Err(e) => {
            warn!("Profile '{}': {}", row.id, e);
            None
        }
    });

    let last_active = row.last_active.as_deref().and_then(|s| match parse_timestamp(s) {
        Some(ts) => Some(ts),
        None => {
            warn!("Corrupt last_active '{}' on profile '{}'", s, row.id);
            None
        }
    });

    Some(RawProfile {
        id,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        location: row.location,
        availability: row.availability,
        support_preferences,
        support_type,
        last_active,
        rating: row.rating,
        is_certified: row.is_certified,
        people_supported: row.people_supported.and_then(|n| u32::try_from(n).ok()),
        journey_note: row.journey_note,
    })
}

pub fn message_from_row(row: MessageRow) -> RawMessage {
    RawMessage {
        id: row.id.parse::<Uuid>().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        sender_id: row.sender_id.parse::<Uuid>().unwrap_or_else(|e| {
            warn!("Corrupt sender_id '{}' on message '{}': {}", row.sender_id, row.id, e);
            Uuid::default()
        }),
        recipient_id: row.recipient_id.parse::<Uuid>().unwrap_or_else(|e| {
            warn!("Corrupt recipient_id '{}' on message '{}': {}", row.recipient_id, row.id, e);
            Uuid::default()
        }),
        created_at: parse_timestamp(&row.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on message '{}'", row.created_at, row.id);
            DateTime::default()
        }),
        content: row.content,
    }
}

/// RFC 3339, or SQLite's `datetime('now')` format read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .ok()
}
