//! API Route Configuration

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};
use crate::utils::constants::DEV_ORIGINS;

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(
            state.config.frontend_url.as_deref(),
        )))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let ioc = Router::new()
        .route("/lookup", post(handlers::lookup_ioc))
        .route("/recent", get(handlers::recent_lookups))
        .route("/:id", get(handlers::get_ioc));

    let api = Router::new()
        .nest("/ioc", ioc)
        .route("/stats", get(handlers::get_stats))
        .route("/stats/reset", post(handlers::reset_stats))
        .route("/health", get(handlers::health_check));

    Router::new()
        .nest("/api", api)
        // Middleware (order matters - bottom runs first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Local dev servers plus the deployed frontend, when set
fn allowed_origins(frontend_url: Option<&str>) -> Vec<HeaderValue> {
    DEV_ORIGINS
        .iter()
        .copied()
        .chain(frontend_url)
        .filter_map(|origin| match HeaderValue::from_str(origin.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let origins = allowed_origins(None);
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:5173");

        let origins = allowed_origins(Some("https://sentry.example.com/"));
        assert_eq!(origins.len(), 3);
        assert_eq!(origins[2], "https://sentry.example.com");
    }
}
