use std::collections::HashSet;

use solace_types::models::{PeerFilter, PeerMatch, SortStrategy};

use crate::normalize::normalize_preferences;

/// Narrows `peers` by, in order: the active flag (only when strictly
/// `Some(true)`), exact support type, and preference overlap. A peer passes
/// the preference check when it shares at least one normalized tag with the
/// filter. Relative order is preserved and the input is left untouched.
pub fn filter_peers(peers: &[PeerMatch], filter: &PeerFilter) -> Vec<PeerMatch> {
    let wanted: HashSet<String> = normalize_preferences(&filter.support_preferences)
        .into_iter()
        .collect();

    peers
        .iter()
        .filter(|peer| filter.active_only != Some(true) || peer.is_active)
        .filter(|peer| match filter.support_type {
            Some(role) => peer.support_type == Some(role),
            None => true,
        })
        .filter(|peer| {
            wanted.is_empty()
                || normalize_preferences(&peer.support_preferences)
                    .iter()
                    .any(|tag| wanted.contains(tag))
        })
        .cloned()
        .collect()
}

/// Returns a newly ordered copy of `peers`. All orderings are stable.
pub fn sort_peers(peers: &[PeerMatch], strategy: SortStrategy) -> Vec<PeerMatch> {
    let mut sorted = peers.to_vec();
    match strategy {
        SortStrategy::Rating => sorted.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortStrategy::PeopleSupported => {
            sorted.sort_by(|a, b| b.people_supported.cmp(&a.people_supported))
        }
        SortStrategy::Availability => sorted.sort_by(|a, b| {
            b.is_active
                .cmp(&a.is_active)
                .then_with(|| b.match_score.cmp(&a.match_score))
        }),
        SortStrategy::Match => sorted.sort_by(|a, b| b.match_score.cmp(&a.match_score)),
    }
    sorted
}

/// Filter, then sort by the filter's strategy.
pub fn apply(peers: &[PeerMatch], filter: &PeerFilter) -> Vec<PeerMatch> {
    sort_peers(&filter_peers(peers, filter), filter.sort_by)
}
