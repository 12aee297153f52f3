pub mod health;
pub mod keys;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use groupkeys_core::repository::KeyReader;
use groupkeys_core::service::FailureNotifier;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<dyn KeyReader>,
    pub notifier: Arc<dyn FailureNotifier>,
}

/// Build the HTTP router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/getGroupOneTimeKeys", get(keys::get_group_one_time_keys))
        .route(
            "/checkIfGroupKeysNeeded",
            post(keys::check_if_group_keys_needed),
        )
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
