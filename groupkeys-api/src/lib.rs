//! HTTP read endpoints
//!
//! Thin query wrappers over the key repository, independent of the
//! message bridge's connection state.

pub mod http;

pub use http::{create_router, AppState};
