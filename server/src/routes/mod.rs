//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the statement endpoint, the pass-through proxy, a
//! health probe, and static files. Anything not matched by a route is looked
//! up under the static directory, with `index.html` answering `/`.

pub mod proxy;
pub mod query;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{any, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/query", post(query::query).layer(cors))
        .route("/proxy/{*target}", any(proxy::proxy))
        .route("/healthz", get(healthz))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
