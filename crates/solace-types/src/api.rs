use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SupportRole;

// -- Token Claims --

/// Claims carried by bearer tokens from the identity provider.
/// `sub` is the user id every handler acts on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Profiles --

/// Onboarding and profile edits. Rating, certification and the
/// supported counter are not user-writable.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub support_preferences: Vec<String>,
    pub support_type: SupportRole,
    #[serde(default)]
    pub journey_note: Option<String>,
}

// -- Peers --

/// Query string for `GET /peers`. Every field is an explicit override of the
/// defaults derived from the caller's own profile.
#[derive(Debug, Default, Deserialize)]
pub struct PeerSearchParams {
    pub support_type: Option<SupportRole>,
    /// Comma-separated tags.
    pub preferences: Option<String>,
    pub active_only: Option<bool>,
    pub sort_by: Option<String>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}
