use std::sync::Arc;

use solace_db::Database;
use solace_matching::{MatchDefaults, ProfileTransformer};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub defaults: MatchDefaults,
    pub transformer: ProfileTransformer,
    /// Upper bound on candidates pulled from the store per peer search.
    pub peer_fetch_limit: u32,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, defaults: MatchDefaults) -> Self {
        Self {
            db,
            jwt_secret,
            transformer: ProfileTransformer::new(defaults.clone()),
            defaults,
            peer_fetch_limit: 200,
        }
    }
}
