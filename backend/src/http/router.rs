//! Router configuration.
//!
//! Sets up the page and API routes, static plot serving, and the CORS,
//! compression and tracing middleware.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let plots = ServeDir::new(&state.config.plots.dir);
    let plots_prefix = normalize_prefix(&state.config.plots.url_prefix);

    let api_v1 = Router::new().route("/transits", post(handlers::analyze));

    Router::new()
        .route("/", get(handlers::index).post(handlers::submit))
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .nest_service(&plots_prefix, plots)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `nest_service` wants a leading slash and no trailing one.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/static/plots".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(AppConfig::default());
        let _router = create_router(state);
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/static/plots/"), "/static/plots");
        assert_eq!(normalize_prefix("plots"), "/plots");
        assert_eq!(normalize_prefix("/"), "/static/plots");
    }
}
