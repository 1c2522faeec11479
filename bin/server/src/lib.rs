//! Clinic portal front server.
//!
//! Serves the built site with the route guard in front of every page.

pub mod config;
pub mod error;
pub mod guard;

use axum::{Router, middleware};
use clinic_portal_platform_access::RouteGuard;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;

/// Builds the application router.
pub fn app(config: &ServerConfig) -> Router {
    let route_guard = Arc::new(RouteGuard::new(config.guard.clone()));

    Router::new()
        .fallback_service(ServeDir::new(&config.site_root).append_index_html_on_directories(true))
        .layer(middleware::from_fn_with_state(route_guard, guard::route_guard))
        .layer(TraceLayer::new_for_http())
}
