//! In-memory forensic store
//!
//! Used by tests and by deployments without `DATABASE_URL`. Records live for
//! the lifetime of the process.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{ForensicRecord, ForensicStore, ForensicStoreError, Grantor};

/// Thread-safe in-memory forensic store
#[derive(Default)]
pub struct MemoryForensicStore {
    /// (document_id, recipient_email) -> record
    records: DashMap<(String, String), ForensicRecord>,
    /// grantor_id -> profile
    grantors: DashMap<String, Grantor>,
}

impl MemoryForensicStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a grantor profile
    pub fn register_grantor(&self, grantor: Grantor) {
        self.grantors.insert(grantor.id.clone(), grantor);
    }

    /// Remove a grantor profile, returning whether it existed
    pub fn remove_grantor(&self, grantor_id: &str) -> bool {
        self.grantors.remove(grantor_id).is_some()
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl ForensicStore for MemoryForensicStore {
    async fn insert(&self, record: &ForensicRecord) -> Result<(), ForensicStoreError> {
        let key = (record.document_id.clone(), record.recipient_email.clone());
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(ForensicStoreError::Conflict {
                document_id: record.document_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(
        &self,
        document_id: &str,
        recipient_email: &str,
    ) -> Result<Option<ForensicRecord>, ForensicStoreError> {
        let key = (document_id.to_string(), recipient_email.to_string());
        Ok(self.records.get(&key).map(|r| r.value().clone()))
    }

    async fn grantor(&self, grantor_id: &str) -> Result<Option<Grantor>, ForensicStoreError> {
        Ok(self.grantors.get(grantor_id).map(|g| g.value().clone()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
