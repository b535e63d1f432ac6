use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use solace_types::models::{ChatMessage, PeerMatch, PeerSummary, RawMessage, RawProfile};

use crate::scorer::match_score;

/// Sender label for the viewer's own messages.
pub const OWN_SENDER_LABEL: &str = "you";

/// Fallback values used when a profile record leaves a field empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDefaults {
    pub anonymous_name: String,
    pub avatar_placeholder: String,
    pub rating: f64,
    pub people_supported: u32,
    /// A peer is active when last seen less than this long ago.
    pub active_window: Duration,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        Self {
            anonymous_name: "Anonymous User".to_string(),
            avatar_placeholder: "👤".to_string(),
            rating: 4.5,
            people_supported: 0,
            active_window: Duration::hours(1),
        }
    }
}

/// Absent timestamps are never active. Timestamps in the future count as active.
pub fn is_active(last_active: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    last_active.is_some_and(|seen| now - seen < window)
}

/// Maps persisted profile records into viewer-facing view models.
#[derive(Debug, Clone, Default)]
pub struct ProfileTransformer {
    defaults: MatchDefaults,
}

impl ProfileTransformer {
    pub fn new(defaults: MatchDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &MatchDefaults {
        &self.defaults
    }

    pub fn to_peer_match(&self, raw: &RawProfile, viewer: Option<&RawProfile>) -> PeerMatch {
        self.to_peer_match_at(raw, viewer, Utc::now())
    }

    pub fn to_peer_match_at(
        &self,
        raw: &RawProfile,
        viewer: Option<&RawProfile>,
        now: DateTime<Utc>,
    ) -> PeerMatch {
        PeerMatch {
            id: raw.id,
            name: self.display_name(raw),
            avatar: self.avatar(raw),
            location: raw.location.clone(),
            availability: raw.availability.clone(),
            support_preferences: raw.support_preferences.clone(),
            support_type: raw.support_type,
            match_score: match_score(viewer, Some(raw)),
            is_active: is_active(raw.last_active, now, self.defaults.active_window),
            rating: raw.rating.unwrap_or(self.defaults.rating),
            is_certified: raw.is_certified.unwrap_or(false),
            people_supported: raw.people_supported.unwrap_or(self.defaults.people_supported),
            journey_note: raw.journey_note.clone(),
            last_active: raw.last_active,
        }
    }

    pub fn to_peer_matches(&self, raws: &[RawProfile], viewer: Option<&RawProfile>) -> Vec<PeerMatch> {
        self.to_peer_matches_at(raws, viewer, Utc::now())
    }

    /// Transforms every record, then orders them by descending score.
    /// Ties keep their input order.
    pub fn to_peer_matches_at(
        &self,
        raws: &[RawProfile],
        viewer: Option<&RawProfile>,
        now: DateTime<Utc>,
    ) -> Vec<PeerMatch> {
        let mut peers: Vec<PeerMatch> = raws
            .iter()
            .map(|raw| self.to_peer_match_at(raw, viewer, now))
            .collect();
        peers.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        peers
    }

    pub fn to_peer_summary(&self, raw: &RawProfile) -> PeerSummary {
        self.to_peer_summary_at(raw, Utc::now())
    }

    pub fn to_peer_summary_at(&self, raw: &RawProfile, now: DateTime<Utc>) -> PeerSummary {
        PeerSummary {
            id: raw.id,
            name: self.display_name(raw),
            avatar: self.avatar(raw),
            support_type: raw.support_type,
            is_active: is_active(raw.last_active, now, self.defaults.active_window),
            last_active: raw.last_active,
        }
    }

    /// Labels the sender as [`OWN_SENDER_LABEL`] when the viewer wrote the
    /// message, otherwise with the peer's display name.
    pub fn format_chat_message(&self, msg: &RawMessage, viewer_id: Uuid, peer: &RawProfile) -> ChatMessage {
        let is_own = msg.sender_id == viewer_id;
        let sender = if is_own {
            OWN_SENDER_LABEL.to_string()
        } else {
            self.display_name(peer)
        };

        ChatMessage {
            id: msg.id,
            content: msg.content.clone(),
            sender,
            sender_id: msg.sender_id,
            is_own,
            timestamp: msg.created_at,
        }
    }

    fn display_name(&self, raw: &RawProfile) -> String {
        non_empty(&raw.display_name).unwrap_or_else(|| self.defaults.anonymous_name.clone())
    }

    fn avatar(&self, raw: &RawProfile) -> String {
        non_empty(&raw.avatar_url).unwrap_or_else(|| self.defaults.avatar_placeholder.clone())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
