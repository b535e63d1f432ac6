use std::collections::HashSet;

use solace_types::models::RawProfile;

use crate::normalize::normalize_preferences;

pub const BASE_SCORE: u32 = 50;
pub const SHARED_TAG_POINTS: u32 = 10;
pub const MAX_SHARED_TAGS: u32 = 3;
pub const LOCATION_POINTS: u32 = 15;
pub const AVAILABILITY_POINTS: u32 = 10;
pub const MAX_SCORE: u32 = 100;

/// Additive compatibility score in `0..=100` between a viewer and a candidate.
///
/// Starts at 50, adds 10 per shared normalized tag (at most 3 counted),
/// 15 for an identical non-empty location and 10 for an identical non-empty
/// availability slot. If either profile is missing the base score is returned.
/// Only intersections and equalities are checked, so argument order does not
/// affect the result.
pub fn match_score(viewer: Option<&RawProfile>, candidate: Option<&RawProfile>) -> u8 {
    let (Some(viewer), Some(candidate)) = (viewer, candidate) else {
        return BASE_SCORE as u8;
    };

    let mut score = BASE_SCORE;

    let shared = shared_tag_count(&viewer.support_preferences, &candidate.support_preferences);
    score += shared.min(MAX_SHARED_TAGS) * SHARED_TAG_POINTS;

    if same_non_empty(&viewer.location, &candidate.location) {
        score += LOCATION_POINTS;
    }
    if same_non_empty(&viewer.availability, &candidate.availability) {
        score += AVAILABILITY_POINTS;
    }

    score.min(MAX_SCORE) as u8
}

/// Number of distinct normalized tags present on both sides.
fn shared_tag_count(a: &[String], b: &[String]) -> u32 {
    let a: HashSet<String> = normalize_preferences(a).into_iter().collect();
    let b: HashSet<String> = normalize_preferences(b).into_iter().collect();
    a.intersection(&b).count() as u32
}

/// Case-sensitive equality of two present, non-empty strings.
fn same_non_empty(a: &Option<String>, b: &Option<String>) -> bool {
    match (a.as_deref(), b.as_deref()) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}
