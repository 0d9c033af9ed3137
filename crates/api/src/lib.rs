//! REST server for the LearNUS tutoring marketplace.
//!
//! Every response body is an envelope: `{"success": true, "data": ...}` on
//! success, `{"success": false, "error": "..."}` otherwise.

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::config::Config;
pub use crate::error::ApiError;
pub use crate::state::AppState;

/// Build the application with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
