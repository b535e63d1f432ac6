use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;

use solace_db::models::ProfileUpsert;
use solace_db::queries::format_timestamp;
use solace_matching::normalize::dedupe_preferences;
use solace_types::api::{Claims, UpdateProfileRequest};
use solace_types::models::RawProfile;

use crate::directory::profile_from_row;
use crate::error::ApiError;
use crate::state::AppState;

pub const MAX_DISPLAY_NAME_CHARS: usize = 64;
pub const MAX_PREFERENCES: usize = 20;
pub const MAX_PREFERENCE_CHARS: usize = 48;
pub const MAX_NOTE_CHARS: usize = 500;

pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RawProfile>, ApiError> {
    let db = state.clone();
    let id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_profile(&id)).await??;

    let profile = row.and_then(profile_from_row).ok_or(ApiError::NotFound("profile"))?;
    Ok(Json(profile))
}

/// Onboarding and later edits both land here.
pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<RawProfile>, ApiError> {
    let display_name = req.display_name.trim().to_string();
    let name_len = display_name.chars().count();
    if name_len == 0 || name_len > MAX_DISPLAY_NAME_CHARS {
        return Err(ApiError::BadRequest(format!(
            "display_name must be 1-{} characters",
            MAX_DISPLAY_NAME_CHARS
        )));
    }

    let preferences = dedupe_preferences(&req.support_preferences);
    if preferences.len() > MAX_PREFERENCES {
        return Err(ApiError::BadRequest(format!(
            "at most {} support preferences allowed",
            MAX_PREFERENCES
        )));
    }
    if preferences.iter().any(|p| p.chars().count() > MAX_PREFERENCE_CHARS) {
        return Err(ApiError::BadRequest(format!(
            "support preferences are limited to {} characters",
            MAX_PREFERENCE_CHARS
        )));
    }
    if req
        .journey_note
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS)
    {
        return Err(ApiError::BadRequest(format!(
            "journey_note is limited to {} characters",
            MAX_NOTE_CHARS
        )));
    }

    let db = state.clone();
    let id = claims.sub.to_string();
    let now = format_timestamp(Utc::now());
    let row = tokio::task::spawn_blocking(move || {
        db.db.upsert_profile(
            &ProfileUpsert {
                id: &id,
                display_name: &display_name,
                avatar_url: blank_to_none(req.avatar_url.as_deref()),
                location: blank_to_none(req.location.as_deref()),
                availability: blank_to_none(req.availability.as_deref()),
                support_preferences: &preferences,
                support_type: req.support_type.as_str(),
                journey_note: blank_to_none(req.journey_note.as_deref()),
            },
            &now,
        )?;
        db.db.get_profile(&id)
    })
    .await??;

    info!(user_id = %claims.sub, "Profile saved");

    let profile = row.and_then(profile_from_row).ok_or(ApiError::NotFound("profile"))?;
    Ok(Json(profile))
}

/// Marks the caller as active now.
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let db = state.clone();
    let id = claims.sub.to_string();
    let now = format_timestamp(Utc::now());
    let touched = tokio::task::spawn_blocking(move || db.db.touch_last_active(&id, &now)).await??;

    if !touched {
        return Err(ApiError::NotFound("profile"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
