// ── Route table ──

use std::path::Path;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use opensesame_api::StateStore;
use opensesame_core::Gateway;

use crate::handlers;

/// Build the bridge router.
///
/// When `static_dir` is set, any path without a route is served from it.
pub fn create_router<S: StateStore>(gateway: Gateway<S>, static_dir: Option<&Path>) -> Router {
    // Browser clients on other origins (the web UI during development).
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/get", get(handlers::read::<S>))
        .route("/open", get(handlers::open::<S>))
        .route("/health", get(handlers::health::<S>));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}
