use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use solace_types::models::{PeerFilter, PeerMatch, RawProfile, SortStrategy, SupportRole};

use crate::filter::apply;
use crate::normalize::normalize_preferences;
use crate::transform::{MatchDefaults, ProfileTransformer, is_active};

/// Failure reported by a profile or peer-listing collaborator.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
}

#[derive(Debug, Clone, Error)]
pub enum MatchError {
    #[error("failed to load peers: {0}")]
    Upstream(#[from] SourceError),
}

/// Parameters handed to the peer-listing service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerQuery {
    pub support_type: Option<SupportRole>,
    /// Already normalized.
    pub support_preferences: Vec<String>,
    pub active_only: bool,
    /// Set when the matcher has not loaded the viewer's profile and wants it
    /// back in [`PeerListing::viewer`].
    pub include_viewer: bool,
}

impl PeerQuery {
    /// Whether `peer` passes the activity, role and tag-overlap criteria.
    /// Listing services use this to fill a bounded page with candidates
    /// that will survive filtering.
    pub fn admits(&self, peer: &RawProfile, now: DateTime<Utc>, active_window: Duration) -> bool {
        if self.active_only && !is_active(peer.last_active, now, active_window) {
            return false;
        }
        if self.support_type.is_some() && peer.support_type != self.support_type {
            return false;
        }
        self.support_preferences.is_empty()
            || normalize_preferences(&peer.support_preferences)
                .iter()
                .any(|tag| self.support_preferences.contains(tag))
    }
}

/// Candidate records plus the viewer's own record, when the service has it.
#[derive(Debug, Clone, Default)]
pub struct PeerListing {
    pub peers: Vec<RawProfile>,
    pub viewer: Option<RawProfile>,
}

/// Reads a single profile by user id.
pub trait ProfileSource: Send + Sync {
    fn fetch_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<RawProfile>, SourceError>> + Send;
}

/// Lists candidate peers for a viewer.
pub trait PeerSource: Send + Sync {
    fn list_peers(
        &self,
        viewer_id: Uuid,
        query: &PeerQuery,
    ) -> impl Future<Output = Result<PeerListing, SourceError>> + Send;
}

/// Caller-supplied criteria. Any field left `None` is derived from the
/// viewer's profile (or the stock default); a supplied field always wins.
#[derive(Debug, Clone, Default)]
pub struct FilterOverrides {
    pub support_type: Option<SupportRole>,
    pub support_preferences: Option<Vec<String>>,
    pub active_only: Option<bool>,
    pub sort_by: Option<SortStrategy>,
}

impl FilterOverrides {
    fn needs_viewer(&self) -> bool {
        self.support_type.is_none() || self.support_preferences.is_none()
    }
}

/// Last applied result. Peers survive a failed refresh. `loading` is true
/// while the newest `find_matches` call is still running.
#[derive(Debug, Clone, Default)]
pub struct MatcherState {
    pub peers: Vec<PeerMatch>,
    pub error: Option<String>,
    pub loading: bool,
}

/// Per-viewer matching session.
///
/// Every `find_matches` call takes a sequence number when it starts; its
/// result is only written to the shared state if no later call has started
/// since. Superseded results are still returned to their own caller.
pub struct PeerMatcher<S> {
    source: S,
    viewer_id: Uuid,
    transformer: ProfileTransformer,
    viewer: OnceCell<Option<RawProfile>>,
    latest: AtomicU64,
    /// Highest token whose call has finished or been dropped.
    settled: AtomicU64,
    state: RwLock<MatcherState>,
}

impl<S> PeerMatcher<S>
where
    S: ProfileSource + PeerSource,
{
    pub fn new(source: S, viewer_id: Uuid) -> Self {
        Self {
            source,
            viewer_id,
            transformer: ProfileTransformer::default(),
            viewer: OnceCell::new(),
            latest: AtomicU64::new(0),
            settled: AtomicU64::new(0),
            state: RwLock::new(MatcherState::default()),
        }
    }

    pub fn with_defaults(mut self, defaults: MatchDefaults) -> Self {
        self.transformer = ProfileTransformer::new(defaults);
        self
    }

    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    /// Fetches the viewer's profile once. A failed or empty fetch is
    /// remembered as "no profile known" and never retried by this matcher.
    pub async fn load_viewer(&self) -> Option<&RawProfile> {
        self.viewer
            .get_or_init(|| async {
                match self.source.fetch_profile(self.viewer_id).await {
                    Ok(Some(profile)) => Some(profile),
                    Ok(None) => {
                        debug!(viewer_id = %self.viewer_id, "Viewer has no profile yet");
                        None
                    }
                    Err(e) => {
                        warn!(viewer_id = %self.viewer_id, "Failed to load viewer profile: {}", e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Derives the effective filter, fetches candidates, scores them against
    /// the viewer, then filters and sorts.
    pub async fn find_matches(&self, overrides: FilterOverrides) -> Result<Vec<PeerMatch>, MatchError> {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let _settle = Settle {
            settled: &self.settled,
            token,
        };

        let viewer = if overrides.needs_viewer() {
            self.load_viewer().await
        } else {
            self.viewer.get().and_then(Option::as_ref)
        };

        let filter = resolve_filter(overrides, viewer);
        let query = PeerQuery {
            support_type: filter.support_type,
            support_preferences: filter.support_preferences.clone(),
            active_only: filter.active_only == Some(true),
            include_viewer: self.viewer.get().is_none(),
        };

        match self.source.list_peers(self.viewer_id, &query).await {
            Ok(listing) => {
                let scoring_viewer = listing.viewer.as_ref().or(viewer);
                let candidates: Vec<RawProfile> = listing
                    .peers
                    .into_iter()
                    .filter(|p| p.id != self.viewer_id)
                    .collect();

                let ranked = self.transformer.to_peer_matches(&candidates, scoring_viewer);
                let peers = apply(&ranked, &filter);

                let applied = self
                    .commit(token, |state| {
                        state.peers = peers.clone();
                        state.error = None;
                    })
                    .await;
                if applied {
                    info!(viewer_id = %self.viewer_id, count = peers.len(), "Peer matches refreshed");
                }
                Ok(peers)
            }
            Err(e) => {
                warn!(viewer_id = %self.viewer_id, "Peer fetch failed: {}", e);
                let message = e.to_string();
                self.commit(token, |state| state.error = Some(message)).await;
                Err(e.into())
            }
        }
    }

    pub async fn snapshot(&self) -> MatcherState {
        let mut state = self.state.read().await.clone();
        state.loading = self.settled.load(Ordering::SeqCst) < self.latest.load(Ordering::SeqCst);
        state
    }

    async fn commit(&self, token: u64, update: impl FnOnce(&mut MatcherState)) -> bool {
        let mut state = self.state.write().await;
        if self.latest.load(Ordering::SeqCst) != token {
            debug!(viewer_id = %self.viewer_id, token, "Discarding superseded peer result");
            return false;
        }
        update(&mut state);
        true
    }
}

/// Marks a `find_matches` call as settled when it returns or its future is
/// dropped mid-flight.
struct Settle<'a> {
    settled: &'a AtomicU64,
    token: u64,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.settled.fetch_max(self.token, Ordering::SeqCst);
    }
}

/// Defaults: the complementary role and the viewer's own normalized tags.
fn resolve_filter(overrides: FilterOverrides, viewer: Option<&RawProfile>) -> PeerFilter {
    let support_type = overrides
        .support_type
        .or_else(|| viewer.and_then(|v| v.support_type).map(SupportRole::complement));

    let support_preferences = match overrides.support_preferences {
        Some(explicit) => normalize_preferences(&explicit),
        None => viewer
            .map(|v| normalize_preferences(&v.support_preferences))
            .unwrap_or_default(),
    };

    PeerFilter {
        support_type,
        support_preferences,
        active_only: overrides.active_only,
        sort_by: overrides.sort_by.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(role: Option<SupportRole>, tags: &[&str]) -> RawProfile {
        RawProfile {
            support_type: role,
            support_preferences: tags.iter().map(|t| t.to_string()).collect(),
            ..RawProfile::new(Uuid::new_v4())
        }
    }

    #[test]
    fn defaults_come_from_viewer() {
        let v = viewer(Some(SupportRole::SupportSeeker), &[" Anxiety", "Sleep"]);
        let filter = resolve_filter(FilterOverrides::default(), Some(&v));
        assert_eq!(filter.support_type, Some(SupportRole::SupportGiver));
        assert_eq!(filter.support_preferences, vec!["anxiety", "sleep"]);
        assert_eq!(filter.sort_by, SortStrategy::Match);
        assert_eq!(filter.active_only, None);
    }

    #[test]
    fn overrides_win() {
        let v = viewer(Some(SupportRole::SupportGiver), &["grief"]);
        let filter = resolve_filter(
            FilterOverrides {
                support_type: Some(SupportRole::SupportGiver),
                support_preferences: Some(vec!["Career".into()]),
                active_only: Some(true),
                sort_by: Some(SortStrategy::Rating),
            },
            Some(&v),
        );
        assert_eq!(filter.support_type, Some(SupportRole::SupportGiver));
        assert_eq!(filter.support_preferences, vec!["career"]);
        assert_eq!(filter.active_only, Some(true));
        assert_eq!(filter.sort_by, SortStrategy::Rating);
    }

    #[test]
    fn no_viewer_means_no_defaults() {
        let filter = resolve_filter(FilterOverrides::default(), None);
        assert_eq!(filter, PeerFilter::default());
    }

    fn query(role: Option<SupportRole>, tags: &[&str], active_only: bool) -> PeerQuery {
        PeerQuery {
            support_type: role,
            support_preferences: tags.iter().map(|t| t.to_string()).collect(),
            active_only,
            include_viewer: false,
        }
    }

    #[test]
    fn query_admits_matching_candidates() {
        let now = Utc::now();
        let window = Duration::hours(1);
        let mut peer = viewer(Some(SupportRole::SupportGiver), &[" Grief ", "career"]);
        peer.last_active = Some(now - Duration::minutes(5));

        assert!(query(None, &[], false).admits(&peer, now, window));
        assert!(query(Some(SupportRole::SupportGiver), &["grief"], true).admits(&peer, now, window));
        assert!(query(None, &["sleep", "career"], false).admits(&peer, now, window));
        assert!(!query(Some(SupportRole::SupportSeeker), &[], false).admits(&peer, now, window));
        assert!(!query(None, &["sleep"], false).admits(&peer, now, window));

        peer.last_active = Some(now - Duration::hours(3));
        assert!(!query(None, &[], true).admits(&peer, now, window));
        peer.last_active = None;
        assert!(!query(None, &[], true).admits(&peer, now, window));
    }

    #[test]
    fn viewer_without_role_leaves_type_open() {
        let v = viewer(None, &[]);
        let filter = resolve_filter(FilterOverrides::default(), Some(&v));
        assert_eq!(filter.support_type, None);
        assert!(filter.support_preferences.is_empty());
    }
}
