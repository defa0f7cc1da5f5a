//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod embed;
pub mod extract;
pub mod health;
pub mod issue;
pub mod verify;

pub use crate::state::AppState;
pub use embed::{embed_handler, EmbedResponse};
pub use extract::{extract_handler, ExtractResponse};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use issue::{issue_handler, IssueRequest, IssueResponse};
pub use verify::forensic_verify_handler;
