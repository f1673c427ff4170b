//! Shared constants and invariants

pub const DEFAULT_LEASE_SECONDS: u64 = 1800;
pub const MAX_LEASE_SECONDS: u64 = 86_400;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 2000;

pub const DEFAULT_CACHE_KEY: &str = "sf_token";
pub const DEFAULT_PROBE_PATH: &str = "/services/data/v59.0/limits";
pub const TOKEN_ENDPOINT_PATH: &str = "/services/oauth2/token";

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

// Retry defaults for token issuance
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 1000;
