//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use tracemark_core::{
    DerivedKeyProvider, DeviceHasher, ImageEmbedder, ImageStrategy, KeyProvider,
    Sha256DeviceHasher, Watermarker,
};

use crate::config::Config;
use crate::error::ApiError;
use crate::forensic::{
    ForensicStore, ForensicVerifier, MemoryForensicStore, PostgresForensicStore,
};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Forensic record store
    pub store: Arc<dyn ForensicStore>,
    /// Per-document key lookup
    pub keys: Arc<dyn KeyProvider>,
    /// Device identity hashing
    pub device_hasher: Arc<dyn DeviceHasher>,
    /// Embedding engine router
    pub watermarker: Watermarker,
    /// Maximum accepted upload in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// State with an explicit store; keys and policy come from `config`.
    pub fn with_store(config: &Config, store: Arc<dyn ForensicStore>) -> Result<Self, ApiError> {
        let master = config
            .master_key
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("TRACEMARK_MASTER_KEY is not set"))?;
        let keys = DerivedKeyProvider::from_hex(master.expose())?;

        let strategy = ImageStrategy::detect();
        if !strategy.is_authoritative() {
            tracing::warn!(
                allow_legacy = config.allow_legacy_image_watermark,
                "Bit-plane embedding unavailable in this build"
            );
        }

        Ok(Self {
            store,
            keys: Arc::new(keys),
            device_hasher: Arc::new(Sha256DeviceHasher::with_salt(config.device_salt.clone())),
            watermarker: Watermarker::new(
                ImageEmbedder::new(strategy),
                config.allow_legacy_image_watermark,
            ),
            max_file_size: config.max_file_size(),
        })
    }

    /// State backed by an in-memory store.
    pub fn in_memory(config: &Config) -> Result<Self, ApiError> {
        Self::with_store(config, Arc::new(MemoryForensicStore::new()))
    }

    /// Connect to the configured store: PostgreSQL when `DATABASE_URL` is
    /// set, in-memory otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        match &config.store.database_url {
            Some(url) => {
                let store = PostgresForensicStore::new(
                    url,
                    config.store.max_connections,
                    config.store.min_connections,
                )
                .await?;
                Self::with_store(config, Arc::new(store))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; forensic records are kept in memory");
                Self::in_memory(config)
            }
        }
    }

    /// Verifier sharing this state's store.
    pub fn verifier(&self) -> ForensicVerifier {
        ForensicVerifier::new(self.store.clone())
    }
}
