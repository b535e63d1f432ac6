use axum::{
    Extension, Json,
    extract::{Query, State},
};

use solace_matching::{FilterOverrides, PeerMatcher};
use solace_types::api::{Claims, PeerSearchParams};
use solace_types::models::{PeerMatch, SortStrategy};

use crate::directory::DbDirectory;
use crate::error::ApiError;
use crate::state::AppState;

/// Ranked peer matches for the caller. Omitted query parameters fall back to
/// defaults derived from the caller's own profile.
pub async fn list_peers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PeerSearchParams>,
) -> Result<Json<Vec<PeerMatch>>, ApiError> {
    let overrides = overrides_from_params(params);

    let matcher = PeerMatcher::new(DbDirectory::new(state.clone()), claims.sub)
        .with_defaults(state.defaults.clone());
    let peers = matcher.find_matches(overrides).await?;

    Ok(Json(peers))
}

fn overrides_from_params(params: PeerSearchParams) -> FilterOverrides {
    FilterOverrides {
        support_type: params.support_type,
        support_preferences: params.preferences.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        }),
        active_only: params.active_only,
        sort_by: params.sort_by.as_deref().map(SortStrategy::parse),
    }
}
