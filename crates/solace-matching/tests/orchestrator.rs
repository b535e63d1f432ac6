/// Orchestrator behavior against an in-process fake of the profile and
/// peer-listing services.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use solace_matching::{
    FilterOverrides, PeerListing, PeerMatcher, PeerQuery, PeerSource, ProfileSource, SourceError,
};
use solace_types::models::{PeerMatch, RawProfile, SortStrategy, SupportRole};

/// Counters and gates shared between a test and the fake it hands to the matcher.
#[derive(Clone, Default)]
struct Probe {
    queries: Arc<Mutex<Vec<PeerQuery>>>,
    profile_calls: Arc<AtomicUsize>,
    /// Signalled when the first `list_peers` call has started.
    entered: Arc<Notify>,
    /// When set, the first `list_peers` call waits on it before returning.
    gate: Option<Arc<Notify>>,
}

struct FakeSource {
    profile: Result<Option<RawProfile>, SourceError>,
    listings: Mutex<VecDeque<Result<PeerListing, SourceError>>>,
    list_calls: AtomicUsize,
    probe: Probe,
}

impl FakeSource {
    fn new(profile: Result<Option<RawProfile>, SourceError>) -> Self {
        Self {
            profile,
            listings: Mutex::new(VecDeque::new()),
            list_calls: AtomicUsize::new(0),
            probe: Probe::default(),
        }
    }

    fn push(self, listing: Result<PeerListing, SourceError>) -> Self {
        self.listings.lock().unwrap().push_back(listing);
        self
    }

    fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl ProfileSource for FakeSource {
    async fn fetch_profile(&self, _user_id: Uuid) -> Result<Option<RawProfile>, SourceError> {
        self.probe.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile.clone()
    }
}

impl PeerSource for FakeSource {
    async fn list_peers(&self, _viewer_id: Uuid, query: &PeerQuery) -> Result<PeerListing, SourceError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.queries.lock().unwrap().push(query.clone());
        let next = self
            .listings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PeerListing::default()));

        if call == 0 {
            self.probe.entered.notify_one();
            if let Some(gate) = &self.probe.gate {
                gate.notified().await;
            }
        }
        next
    }
}

fn profile(name: &str, role: SupportRole, tags: &[&str]) -> RawProfile {
    RawProfile {
        display_name: Some(name.to_string()),
        support_type: Some(role),
        support_preferences: tags.iter().map(|t| t.to_string()).collect(),
        last_active: Some(Utc::now()),
        ..RawProfile::new(Uuid::new_v4())
    }
}

fn names(peers: &[PeerMatch]) -> Vec<String> {
    peers.iter().map(|p| p.name.clone()).collect()
}

#[tokio::test]
async fn derives_defaults_from_viewer_profile() {
    let me = profile("me", SupportRole::SupportSeeker, &["Anxiety", "Grief"]);
    let giver = profile("giver", SupportRole::SupportGiver, &["anxiety"]);
    let other_giver = profile("other", SupportRole::SupportGiver, &["career"]);
    let seeker = profile("seeker", SupportRole::SupportSeeker, &["grief"]);

    let source = FakeSource::new(Ok(Some(me.clone()))).push(Ok(PeerListing {
        peers: vec![other_giver, seeker, giver],
        viewer: None,
    }));
    let matcher = PeerMatcher::new(source, me.id);

    let peers = matcher.find_matches(FilterOverrides::default()).await.unwrap();

    assert_eq!(names(&peers), vec!["giver"]);
    assert_eq!(peers[0].match_score, 60);

    let state = matcher.snapshot().await;
    assert_eq!(names(&state.peers), vec!["giver"]);
    assert!(state.error.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn query_carries_normalized_defaults() {
    let me = profile("me", SupportRole::SupportGiver, &[" Sleep ", "WORK"]);
    let source = FakeSource::new(Ok(Some(me.clone())));
    let probe = source.probe();
    let matcher = PeerMatcher::new(source, me.id);

    matcher
        .find_matches(FilterOverrides { active_only: Some(true), ..Default::default() })
        .await
        .unwrap();

    let queries = probe.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![PeerQuery {
            support_type: Some(SupportRole::SupportSeeker),
            support_preferences: vec!["sleep".into(), "work".into()],
            active_only: true,
            include_viewer: false,
        }]
    );
}

#[tokio::test]
async fn explicit_filters_skip_profile_fetch() {
    let me_id = Uuid::new_v4();
    let seeker = profile("seeker", SupportRole::SupportSeeker, &["grief"]);
    let source = FakeSource::new(Ok(None)).push(Ok(PeerListing {
        peers: vec![seeker],
        viewer: None,
    }));
    let probe = source.probe();
    let matcher = PeerMatcher::new(source, me_id);

    let peers = matcher
        .find_matches(FilterOverrides {
            support_type: Some(SupportRole::SupportSeeker),
            support_preferences: Some(vec!["Grief".into()]),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(names(&peers), vec!["seeker"]);
    assert_eq!(peers[0].match_score, 50);
    assert_eq!(probe.profile_calls.load(Ordering::SeqCst), 0);
    // The listing is asked for the viewer record instead.
    assert!(probe.queries.lock().unwrap()[0].include_viewer);
}

#[tokio::test]
async fn explicit_overrides_beat_profile_defaults() {
    let me = profile("me", SupportRole::SupportSeeker, &["grief"]);
    let giver = profile("giver", SupportRole::SupportGiver, &["grief"]);
    let seeker = profile("seeker", SupportRole::SupportSeeker, &["Grief"]);
    let other_seeker = profile("other", SupportRole::SupportSeeker, &["career"]);

    let source = FakeSource::new(Ok(Some(me.clone()))).push(Ok(PeerListing {
        peers: vec![giver, other_seeker, seeker],
        viewer: None,
    }));
    let matcher = PeerMatcher::new(source, me.id);

    let peers = matcher
        .find_matches(FilterOverrides {
            support_type: Some(SupportRole::SupportSeeker),
            ..Default::default()
        })
        .await
        .unwrap();

    // Support type overridden; preferences still default to the viewer's tags.
    assert_eq!(names(&peers), vec!["seeker"]);
}

#[tokio::test]
async fn failed_profile_load_is_not_fatal() {
    let giver = profile("giver", SupportRole::SupportGiver, &["anxiety"]);
    let seeker = profile("seeker", SupportRole::SupportSeeker, &["anxiety"]);
    let source = FakeSource::new(Err(SourceError::Unavailable("timeout".into()))).push(Ok(PeerListing {
        peers: vec![giver, seeker],
        viewer: None,
    }));
    let matcher = PeerMatcher::new(source, Uuid::new_v4());

    let peers = matcher.find_matches(FilterOverrides::default()).await.unwrap();

    assert_eq!(peers.len(), 2);
    assert!(peers.iter().all(|p| p.match_score == 50));
    assert!(matcher.load_viewer().await.is_none());
}

#[tokio::test]
async fn viewer_profile_is_fetched_once() {
    let me = profile("me", SupportRole::SupportGiver, &[]);
    let source = FakeSource::new(Ok(Some(me.clone())));
    let probe = source.probe();
    let matcher = PeerMatcher::new(source, me.id);

    for _ in 0..3 {
        matcher.find_matches(FilterOverrides::default()).await.unwrap();
    }
    assert_eq!(matcher.load_viewer().await.map(|v| v.id), Some(me.id));
    assert_eq!(probe.profile_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listing_viewer_is_used_for_scoring() {
    let me = profile("me", SupportRole::SupportSeeker, &["grief"]);
    let giver = profile("giver", SupportRole::SupportGiver, &["grief"]);
    let source = FakeSource::new(Ok(None)).push(Ok(PeerListing {
        peers: vec![giver, me.clone()],
        viewer: Some(me.clone()),
    }));
    let matcher = PeerMatcher::new(source, me.id);

    let peers = matcher
        .find_matches(FilterOverrides {
            support_type: Some(SupportRole::SupportGiver),
            support_preferences: Some(vec![]),
            ..Default::default()
        })
        .await
        .unwrap();

    // The viewer's own record is never offered as a peer.
    assert_eq!(names(&peers), vec!["giver"]);
    assert_eq!(peers[0].match_score, 60);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_peers() {
    let giver = profile("giver", SupportRole::SupportGiver, &[]);
    let source = FakeSource::new(Ok(None))
        .push(Ok(PeerListing { peers: vec![giver], viewer: None }))
        .push(Err(SourceError::Unavailable("connection reset".into())));
    let matcher = PeerMatcher::new(source, Uuid::new_v4());

    matcher.find_matches(FilterOverrides::default()).await.unwrap();
    let err = matcher.find_matches(FilterOverrides::default()).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));

    let state = matcher.snapshot().await;
    assert_eq!(names(&state.peers), vec!["giver"]);
    assert!(state.error.as_deref().unwrap().contains("connection reset"));
    assert!(!state.loading);
}

#[tokio::test]
async fn superseded_result_is_not_applied() {
    let slow = profile("slow", SupportRole::SupportGiver, &[]);
    let fast = profile("fast", SupportRole::SupportGiver, &[]);

    let mut source = FakeSource::new(Ok(None))
        .push(Ok(PeerListing { peers: vec![slow], viewer: None }))
        .push(Ok(PeerListing { peers: vec![fast], viewer: None }));
    let gate = Arc::new(Notify::new());
    source.probe.gate = Some(gate.clone());
    let probe = source.probe();
    let matcher = Arc::new(PeerMatcher::new(source, Uuid::new_v4()));

    let slow_call = tokio::spawn({
        let matcher = matcher.clone();
        async move { matcher.find_matches(FilterOverrides::default()).await }
    });
    probe.entered.notified().await;

    let second = matcher.find_matches(FilterOverrides::default()).await;
    gate.notify_one();
    let first = slow_call.await.unwrap();

    // Each caller still sees its own result.
    assert_eq!(names(&first.unwrap()), vec!["slow"]);
    assert_eq!(names(&second.unwrap()), vec!["fast"]);

    // Only the newest call is applied.
    let state = matcher.snapshot().await;
    assert_eq!(names(&state.peers), vec!["fast"]);
    assert!(!state.loading);
}

#[tokio::test]
async fn sort_strategy_override_is_applied() {
    let mut low = profile("low", SupportRole::SupportGiver, &[]);
    low.rating = Some(3.2);
    let mut high = profile("high", SupportRole::SupportGiver, &[]);
    high.rating = Some(4.9);
    let source = FakeSource::new(Ok(None)).push(Ok(PeerListing {
        peers: vec![low, high],
        viewer: None,
    }));
    let matcher = PeerMatcher::new(source, Uuid::new_v4());

    let peers = matcher
        .find_matches(FilterOverrides { sort_by: Some(SortStrategy::Rating), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(names(&peers), vec!["high", "low"]);
}

#[tokio::test]
async fn dropped_call_does_not_leave_loading_set() {
    let mut source = FakeSource::new(Ok(None));
    let gate = Arc::new(Notify::new());
    source.probe.gate = Some(gate);
    let probe = source.probe();
    let matcher = Arc::new(PeerMatcher::new(source, Uuid::new_v4()));

    let call = tokio::spawn({
        let matcher = matcher.clone();
        async move { matcher.find_matches(FilterOverrides::default()).await }
    });
    probe.entered.notified().await;
    assert!(matcher.snapshot().await.loading);

    call.abort();
    assert!(call.await.unwrap_err().is_cancelled());

    let state = matcher.snapshot().await;
    assert!(!state.loading);
    assert!(state.peers.is_empty());
    assert!(state.error.is_none());
}
