//! Peer matching: tag normalization, compatibility scoring, view-model
//! transforms, filter/sort combinators, and the per-viewer orchestrator.

pub mod filter;
pub mod normalize;
pub mod orchestrator;
pub mod scorer;
pub mod transform;

pub use filter::{apply, filter_peers, sort_peers};
pub use orchestrator::{
    FilterOverrides, MatchError, MatcherState, PeerListing, PeerMatcher, PeerQuery, PeerSource,
    ProfileSource, SourceError,
};
pub use scorer::match_score;
pub use transform::{MatchDefaults, ProfileTransformer};
