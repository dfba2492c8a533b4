//! ============================================================================
//! HERALD-SERVER: REST backend for the web frontend
//! ============================================================================
//! Twitter connect flow (PKCE), tweet generation and posting, health checks.
//! Handlers are thin: they sequence herald-core calls and map errors to HTTP.
//! ============================================================================

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use routes::{content, health, twitter};

/// CORS restricted to the configured frontend origin
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = frontend_url.trim_end_matches('/');
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("FRONTEND_URL is not a valid origin ({}); CORS disabled", e);
            CorsLayer::new()
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.frontend_url);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/test", get(health::test_endpoint))
        .route("/twitter/auth-url", get(twitter::auth_url))
        .route("/twitter/callback", get(twitter::callback))
        .route("/twitter/status/:user_id", get(twitter::status))
        .route("/twitter/disconnect/:user_id", delete(twitter::disconnect))
        .route("/generate-twitter-post", post(content::generate_tweet))
        .route("/post-twitter-post", post(twitter::post_tweet))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
