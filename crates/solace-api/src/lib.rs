pub mod directory;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod peers;
pub mod profiles;
pub mod state;

use axum::{
    Json, Router,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// All API routes. Everything except `/health` requires a bearer token.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/profile/me", get(profiles::get_my_profile).put(profiles::update_my_profile))
        .route("/profile/me/heartbeat", post(profiles::heartbeat))
        .route("/peers", get(peers::list_peers))
        .route("/conversations", get(messages::list_conversations))
        .route(
            "/peers/{peer_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
