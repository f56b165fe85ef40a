use crate::config;
use crate::state;

use axum::Router;
use axum::routing::{get, post, put};

mod assets;
mod presence;
mod push;

pub fn app(config: config::ServerConfig) -> Router {
    if let crate::push::VapidConfigStatus::Incomplete = crate::push::load_vapid_config(&config) {
        tracing::warn!("push notifications disabled: incomplete VAPID configuration");
    }
    let state = state::AppState::new(config);
    router(state)
}

pub(crate) fn router(state: state::AppState) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/manifest.json", get(assets::manifest))
        .route("/favicon.ico", get(assets::favicon))
        .route("/api/push/vapid-public-key", get(push::vapid_public_key))
        .route("/api/push/save-subscription", post(push::save_subscription))
        .route(
            "/api/push/delete-subscription",
            post(push::delete_subscription),
        )
        .route("/api/push/test", post(push::push_test))
        .route("/api/{admin_id}/activity", put(presence::mark_active))
        .route("/api/{admin_id}/offline", put(presence::mark_offline))
        .route("/api/debug/subscriptions", get(push::subscriptions_debug))
        .route("/api/debug/presence", get(presence::presence_debug))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
