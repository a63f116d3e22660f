use crate::config;
use crate::push as push_service;
use crate::state;

use axum::Router;
use axum::routing::get;
use axum::routing::post;

use std::sync::Arc;

mod push;

pub fn app(config: config::AppConfig) -> Router {
    app_with_registry(
        config,
        Arc::new(push_service::SubscriptionRegistry::default()),
    )
}

/// Same router, but over a caller-owned registry, so an embedder can share
/// it with a dispatcher and change routers.
pub fn app_with_registry(
    config: config::AppConfig,
    registry: Arc<push_service::SubscriptionRegistry>,
) -> Router {
    let state = state::AppState { config, registry };
    Router::new()
        .route("/api/push/subscribe", post(push::subscribe_admin))
        .route("/api/push/subscribe/driver", post(push::subscribe_driver))
        .route("/api/push/public-key", get(push::public_key))
        .route("/api/push/test", post(push::push_test))
        .route("/api/debug/push/registry", get(push::registry_debug))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
