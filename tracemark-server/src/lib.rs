//! Tracemark Server Library - REST API components for recipient watermarking
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod error;
pub mod forensic;
pub mod handlers;
pub mod multipart;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::{Config, MasterKeyHex, RateLimitConfig, StoreConfig};
pub use error::ApiError;
pub use forensic::{
    Confidence, ForensicErrorCode, ForensicRecord, ForensicStore, ForensicStoreError,
    ForensicVerifier, ForensicVerifyRequest, ForensicVerifyResponse, Grantor,
    MemoryForensicStore, PostgresForensicStore,
};
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_config, create_router_with_state};
pub use state::AppState;
