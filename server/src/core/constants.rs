//! Application-wide constants and environment variable names

/// Application name (lowercase, used in log filters)
pub const APP_NAME_LOWER: &str = "relay_meter";

/// Log filter env var, falls back to RUST_LOG
pub const ENV_LOG: &str = "RELAY_METER_LOG";

// =============================================================================
// Environment variable names
// =============================================================================

pub const ENV_API_KEYS: &str = "API_KEYS";
pub const ENV_BACKEND_API_URL: &str = "BACKEND_API_URL";
pub const ENV_BACKEND_API_TOKEN: &str = "BACKEND_API_TOKEN";
pub const ENV_LOAD_INTERVAL_SECONDS: &str = "LOAD_INTERVAL_SECONDS";
pub const ENV_DAILY_METRICS_TTL_SECONDS: &str = "DAILY_METRICS_TTL_SECONDS";
pub const ENV_TODAYS_METRICS_TTL_SECONDS: &str = "TODAYS_METRICS_TTL_SECONDS";
pub const ENV_MAX_ARCHIVE_AGE: &str = "MAX_ARCHIVE_AGE";
pub const ENV_COLLECTION_INTERVAL_SECONDS: &str = "COLLECTION_INTERVAL_SECONDS";
pub const ENV_REPORT_INTERVAL_SECONDS: &str = "REPORT_INTERVAL_SECONDS";
pub const ENV_API_SERVER_PORT: &str = "API_SERVER_PORT";

pub const ENV_POSTGRES_URL: &str = "POSTGRES_URL";
pub const ENV_POSTGRES_HOST: &str = "POSTGRES_HOST";
pub const ENV_POSTGRES_PORT: &str = "POSTGRES_PORT";
pub const ENV_POSTGRES_USER: &str = "POSTGRES_USER";
pub const ENV_POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_POSTGRES_DB: &str = "POSTGRES_DB";

pub const ENV_CLICKHOUSE_URL: &str = "CLICKHOUSE_URL";
pub const ENV_CLICKHOUSE_DATABASE: &str = "CLICKHOUSE_DATABASE";
pub const ENV_CLICKHOUSE_USER: &str = "CLICKHOUSE_USER";
pub const ENV_CLICKHOUSE_PASSWORD: &str = "CLICKHOUSE_PASSWORD";

// =============================================================================
// Defaults (env table)
// =============================================================================

pub const DEFAULT_LOAD_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_DAILY_METRICS_TTL_SECS: u64 = 120;
pub const DEFAULT_TODAYS_METRICS_TTL_SECS: u64 = 60;
pub const DEFAULT_MAX_ARCHIVE_AGE_DAYS: i64 = 30;
pub const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_API_SERVER_PORT: u16 = 9898;
pub const DEFAULT_CLICKHOUSE_DATABASE: &str = "telemetry";

// =============================================================================
// Meter fallbacks, applied when the configured value is zero
// =============================================================================

pub const METER_DEFAULT_DAILY_TTL_SECS: u64 = 900;
pub const METER_DEFAULT_TODAYS_TTL_SECS: u64 = 600;
pub const METER_DEFAULT_MAX_PAST_DAYS: i64 = 30;

// =============================================================================
// PostgreSQL pool settings
// =============================================================================

pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Misc
// =============================================================================

/// Upper bound on graceful shutdown drain
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Portal identity service request timeout
pub const PORTAL_HTTP_TIMEOUT_SECS: u64 = 20;
