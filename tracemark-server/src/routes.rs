//! HTTP routing and middleware stack

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, RateLimitConfig};
use crate::error::ApiError;
use crate::handlers::{
    embed_handler, extract_handler, forensic_verify_handler, health, issue_handler, ready,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the application router with default config and an in-memory
/// store (for testing)
pub fn create_router() -> Result<Router, ApiError> {
    let config = Config::default();
    let state = AppState::in_memory(&config)?;
    Ok(create_router_with_state(&config, state))
}

/// Create the application router, connecting the store `config` names
pub async fn create_router_with_config(config: &Config) -> Result<Router, ApiError> {
    let state = AppState::from_config(config).await?;
    Ok(create_router_with_state(config, state))
}

/// Create the application router around prepared state
pub fn create_router_with_state(config: &Config, state: AppState) -> Router {
    let router = Router::new()
        .route("/watermark/issue", post(issue_handler))
        .route("/watermark/embed", post(embed_handler))
        .route("/watermark/extract", post(extract_handler))
        .route("/forensic/verify", post(forensic_verify_handler))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors_layer(config.allowed_origins.as_deref()))
        // Multipart keeps axum's own 2 MiB cap unless it is lifted here
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(RequestBodyLimitLayer::new(config.body_limit()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.timeout_secs),
        ));

    with_rate_limit(router, &config.rate_limit).layer(TraceLayer::new_for_http())
}

/// Browsers may only call from `origins` when a list is configured.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins.filter(|o| !o.is_empty()) else {
        tracing::warn!("CORS open to any origin; set ALLOWED_ORIGINS in production");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    };

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.len() != origins.len() {
        tracing::warn!(
            configured = origins.len(),
            usable = parsed.len(),
            "Some CORS origins were not valid header values"
        );
    }
    tracing::info!(origins = parsed.len(), "CORS restricted");

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Per-peer rate limiting. Keys on the connecting address, so routers driven
/// through `oneshot` must leave it off.
fn with_rate_limit(router: Router, limits: &RateLimitConfig) -> Router {
    if !limits.enabled {
        tracing::warn!("Rate limiting: DISABLED");
        return router;
    }

    let Some(governor) = GovernorConfigBuilder::default()
        .per_second(limits.per_sec)
        .burst_size(limits.burst)
        .finish()
    else {
        tracing::error!(
            per_sec = limits.per_sec,
            burst = limits.burst,
            "Invalid rate limit settings; rate limiting DISABLED"
        );
        return router;
    };

    tracing::info!(
        per_sec = limits.per_sec,
        burst = limits.burst,
        "Rate limiting enabled"
    );
    router.layer(GovernorLayer::new(Arc::new(governor)))
}
