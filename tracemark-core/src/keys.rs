//! Key material and device-binding collaborators.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, TracemarkError};

type HmacSha256 = Hmac<Sha256>;

/// Length of generated keys in bytes.
pub const GENERATED_KEY_BYTES: usize = 32;

/// Domain separator for per-document key derivation.
const DOCUMENT_KEY_CONTEXT: &[u8] = b"tracemark/document-key/v1|";

/// Symmetric watermark key, zeroized on drop.
///
/// HMAC tolerates any key length, so no length is enforced beyond non-empty.
pub struct WatermarkKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl WatermarkKey {
    /// Import a hex-encoded key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(key_hex.trim())
            .map_err(|e| TracemarkError::Key(format!("Key is not valid hex: {}", e)))?;
        if bytes.is_empty() {
            return Err(TracemarkError::Key("Key must not be empty".into()));
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Build an HMAC-SHA256 instance keyed with this key.
    pub(crate) fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.bytes)
            .map_err(|e| TracemarkError::Key(format!("HMAC key rejected: {}", e)))
    }
}

impl std::fmt::Debug for WatermarkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Generate a random 32-byte key, hex-encoded.
pub fn generate_key_hex() -> Result<String> {
    let mut bytes = Zeroizing::new([0u8; GENERATED_KEY_BYTES]);
    getrandom::fill(bytes.as_mut())
        .map_err(|e| TracemarkError::Key(format!("OS randomness unavailable: {}", e)))?;
    Ok(hex::encode(bytes.as_ref()))
}

/// Lookup of the per-document symmetric key.
pub trait KeyProvider: Send + Sync {
    /// Hex-encoded key for `document_id`.
    fn document_key(&self, document_id: &str) -> Result<String>;
}

/// Derives per-document keys from a single master secret.
///
/// `key = HMAC-SHA256(master, context ++ document_id)`.
#[derive(Debug)]
pub struct DerivedKeyProvider {
    master: WatermarkKey,
}

impl DerivedKeyProvider {
    pub fn new(master: WatermarkKey) -> Self {
        Self { master }
    }

    pub fn from_hex(master_hex: &str) -> Result<Self> {
        Ok(Self::new(WatermarkKey::from_hex(master_hex)?))
    }
}

impl KeyProvider for DerivedKeyProvider {
    fn document_key(&self, document_id: &str) -> Result<String> {
        let mut mac = self.master.mac()?;
        mac.update(DOCUMENT_KEY_CONTEXT);
        mac.update(document_id.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Stable device-identity hashing.
pub trait DeviceHasher: Send + Sync {
    /// Hash a device identifier. An empty identifier hashes to an empty string.
    fn hash_device(&self, device_id: &str) -> String;
}

/// SHA-256 device hasher with an optional salt prefix.
#[derive(Debug, Clone, Default)]
pub struct Sha256DeviceHasher {
    salt: String,
}

impl Sha256DeviceHasher {
    pub fn with_salt(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }
}

impl DeviceHasher for Sha256DeviceHasher {
    fn hash_device(&self, device_id: &str) -> String {
        if device_id.is_empty() {
            return String::new();
        }
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(device_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}
