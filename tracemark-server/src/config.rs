//! Server configuration
//!
//! Everything is read from the process environment once at startup.
//! `Config::default()` is the profile used by tests and local runs: loopback
//! only, no rate limiting, an in-memory store and a fixed development key.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Master key used by `Config::default()`. Never use outside tests and local runs.
pub const DEV_MASTER_KEY: &str = "6465762d6f6e6c792d7472616365";

const MIB: usize = 1024 * 1024;

/// Hex-encoded master secret; redacted in `Debug` output.
#[derive(Clone)]
pub struct MasterKeyHex(String);

impl MasterKeyHex {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for MasterKeyHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKeyHex(<redacted>)")
    }
}

/// Per-peer request throttling (`RATE_LIMIT_*`).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_sec: u64,
    pub burst: u32,
}

/// Forensic record storage (`DATABASE_*`).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// PostgreSQL URL; records stay in memory when unset
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Browser origins allowed by CORS; `None` leaves CORS open
    pub allowed_origins: Option<Vec<String>>,
    pub body_limit_mb: usize,
    pub max_file_size_mb: usize,
    pub timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub store: StoreConfig,
    /// Master secret for per-document key derivation
    pub master_key: Option<MasterKeyHex>,
    /// Salt prefixed to device identifiers before hashing
    pub device_salt: String,
    /// Accept strippable trailing-chunk image marks when bit-plane
    /// embedding is unavailable
    pub allow_legacy_image_watermark: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            allowed_origins: None,
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit: RateLimitConfig {
                enabled: false,
                per_sec: 10,
                burst: 20,
            },
            store: StoreConfig {
                database_url: None,
                max_connections: 20,
                min_connections: 2,
            },
            master_key: Some(MasterKeyHex::new(DEV_MASTER_KEY)),
            device_salt: String::new(),
            allow_legacy_image_watermark: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values keep their defaults, except that rate
    /// limiting is on unless `RATE_LIMIT_ENABLED=false` and there is no
    /// development master key.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env_parse("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            allowed_origins: env_nonempty("ALLOWED_ORIGINS").map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            }),
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB").unwrap_or(defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit: RateLimitConfig {
                enabled: env_flag("RATE_LIMIT_ENABLED").unwrap_or(true),
                per_sec: env_parse("RATE_LIMIT_PER_SEC").unwrap_or(defaults.rate_limit.per_sec),
                burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit.burst),
            },
            store: StoreConfig {
                database_url: env_nonempty("DATABASE_URL"),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.store.max_connections),
                min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(defaults.store.min_connections),
            },
            master_key: env_nonempty("TRACEMARK_MASTER_KEY").map(MasterKeyHex::new),
            device_salt: std::env::var("TRACEMARK_DEVICE_SALT").unwrap_or_default(),
            allow_legacy_image_watermark: env_flag("ALLOW_LEGACY_IMAGE_WATERMARK")
                .unwrap_or(false),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Maximum upload size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * MIB
    }

    /// Maximum request body in bytes
    pub fn body_limit(&self) -> usize {
        self.body_limit_mb * MIB
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_nonempty(name).and_then(|v| v.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    env_nonempty(name).map(|v| parse_flag(&v))
}

/// Anything but an explicit false-ish word counts as on.
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
