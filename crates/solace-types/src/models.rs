use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::serde_lenient;

/// Whether a user is looking for support or offering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportRole {
    SupportSeeker,
    SupportGiver,
}

impl SupportRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SupportRole::SupportSeeker => "support-seeker",
            SupportRole::SupportGiver => "support-giver",
        }
    }

    /// The role a user of this role is matched against.
    pub fn complement(self) -> Self {
        match self {
            SupportRole::SupportSeeker => SupportRole::SupportGiver,
            SupportRole::SupportGiver => SupportRole::SupportSeeker,
        }
    }
}

impl fmt::Display for SupportRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown support role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for SupportRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "support-seeker" => Ok(SupportRole::SupportSeeker),
            "support-giver" => Ok(SupportRole::SupportGiver),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A persisted profile record as it crosses into the matching layer.
///
/// Every field but `id` may be missing. Missing or malformed values
/// deserialize to their defaults instead of failing the whole record:
/// non-string preference entries are dropped and unknown roles become `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProfile {
    pub id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default, deserialize_with = "serde_lenient::string_list")]
    pub support_preferences: Vec<String>,
    #[serde(default, deserialize_with = "serde_lenient::support_role")]
    pub support_type: Option<SupportRole>,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub is_certified: Option<bool>,
    #[serde(default)]
    pub people_supported: Option<u32>,
    #[serde(default)]
    pub journey_note: Option<String>,
}

impl RawProfile {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// A stored direct message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A profile projected from one viewer's point of view.
/// Recomputed on every fetch, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerMatch {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub location: Option<String>,
    pub availability: Option<String>,
    pub support_preferences: Vec<String>,
    pub support_type: Option<SupportRole>,
    pub match_score: u8,
    pub is_active: bool,
    pub rating: f64,
    pub is_certified: bool,
    pub people_supported: u32,
    pub journey_note: Option<String>,
    pub last_active: Option<DateTime<Utc>>,
}

/// Peer as shown in a conversation list. No score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub support_type: Option<SupportRole>,
    pub is_active: bool,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub content: String,
    /// `"you"` for the viewer's own messages, otherwise the peer's display name.
    pub sender: String,
    pub sender_id: Uuid,
    pub is_own: bool,
    pub timestamp: DateTime<Utc>,
}

/// Ordering applied to a filtered peer list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum SortStrategy {
    #[default]
    Match,
    Rating,
    PeopleSupported,
    Availability,
}

impl SortStrategy {
    /// Unrecognized names fall back to `Match`.
    pub fn parse(name: &str) -> Self {
        match name {
            "rating" => SortStrategy::Rating,
            "peopleSupported" => SortStrategy::PeopleSupported,
            "availability" => SortStrategy::Availability,
            _ => SortStrategy::Match,
        }
    }
}

impl From<String> for SortStrategy {
    fn from(name: String) -> Self {
        SortStrategy::parse(&name)
    }
}

/// Request-scoped filter criteria. Built per query, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerFilter {
    pub support_type: Option<SupportRole>,
    pub support_preferences: Vec<String>,
    /// Only `Some(true)` narrows the list.
    pub active_only: Option<bool>,
    pub sort_by: SortStrategy,
}
