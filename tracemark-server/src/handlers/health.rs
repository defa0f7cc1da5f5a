//! Liveness and readiness checks

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Image embedding strategy in use: "bit-plane" or "legacy-append"
    #[schema(example = "bit-plane")]
    pub image_strategy: String,
    /// Whether authoritative (bit-plane) image marks can be produced
    pub bit_plane_available: bool,
    /// Service name
    pub service: &'static str,
}

/// Liveness check
///
/// Reports `degraded` when this build cannot produce bit-plane image marks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let strategy = state.watermarker.image_strategy();
    let bit_plane_available = strategy.is_authoritative();

    let status = if bit_plane_available {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        image_strategy: strategy.to_string(),
        bit_plane_available,
        service: "tracemark-server",
    })
}

/// Readiness response for orchestrators
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service can accept traffic
    pub ready: bool,
    /// Forensic store backend: "memory" or "postgres"
    #[schema(example = "postgres")]
    pub store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check
///
/// Answers 503 while the forensic store cannot be reached.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready", body = ReadyResponse),
        (status = 503, description = "Forensic store unreachable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let store = state.store.backend();

    match state.store.ping().await {
        Ok(()) => {
            let message = (store == "memory").then(|| "Forensic records are not persisted".into());
            (
                StatusCode::OK,
                Json(ReadyResponse {
                    ready: true,
                    store,
                    message,
                }),
            )
        }
        Err(e) => {
            tracing::warn!(store, error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    store,
                    message: Some("Forensic store unreachable".into()),
                }),
            )
        }
    }
}
