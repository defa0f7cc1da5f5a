//! Forensic anchors and their verification.
//!
//! A [`ForensicRecord`] is written once per (document, recipient) at issue
//! time and never updated. The [`ForensicVerifier`] judges every later
//! extraction against it.

pub mod memory;
pub mod postgres;
pub mod verifier;

pub use memory::MemoryForensicStore;
pub use postgres::PostgresForensicStore;
pub use verifier::{
    Confidence, ForensicDetails, ForensicErrorCode, ForensicVerifier, ForensicVerifyRequest,
    ForensicVerifyResponse, GrantorSummary,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Durable anchor for one issued watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForensicRecord {
    pub document_id: String,
    /// Lower-cased recipient email
    pub recipient_email: String,
    pub grantor_id: String,
    /// SHA-256 hex of the full signed payload
    pub watermark_hash: String,
    pub signature: String,
    pub device_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Account that granted access to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grantor {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Errors from a forensic store backend.
#[derive(Debug, Error)]
pub enum ForensicStoreError {
    /// A record already exists for this (document, recipient)
    #[error("Forensic record already exists for document {document_id}")]
    Conflict { document_id: String },

    /// Database connection failed
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// SQL query execution failed
    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for ForensicStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for ForensicStoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

/// Persistence for forensic anchors, keyed by (document, recipient).
///
/// Implementations MUST treat `insert` as write-once: a second insert for
/// the same key fails with [`ForensicStoreError::Conflict`] and leaves the
/// original record untouched.
#[async_trait]
pub trait ForensicStore: Send + Sync {
    /// Store a new record.
    async fn insert(&self, record: &ForensicRecord) -> Result<(), ForensicStoreError>;

    /// Load the record for `(document_id, recipient_email)`.
    async fn get(
        &self,
        document_id: &str,
        recipient_email: &str,
    ) -> Result<Option<ForensicRecord>, ForensicStoreError>;

    /// Load a grantor profile.
    async fn grantor(&self, grantor_id: &str) -> Result<Option<Grantor>, ForensicStoreError>;

    /// Cheap round trip to the backend for readiness checks.
    async fn ping(&self) -> Result<(), ForensicStoreError> {
        Ok(())
    }

    /// Backend name for readiness reporting.
    fn backend(&self) -> &'static str;
}
