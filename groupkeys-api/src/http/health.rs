//! Health check endpoint
//!
//! Simple liveness probe for monitoring.

use axum::response::IntoResponse;

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}
