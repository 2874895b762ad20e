//! PostgreSQL schema definitions
//!
//! Initial schema for the relay usage store. The daily table is append-only
//! and owned by the collector; the three `todays_*` tables are truncated and
//! repopulated wholesale on every refresh; the ingest table is upserted by
//! the HTTP ingest path.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL for PostgreSQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

-- =============================================================================
-- 1. Daily relay sums: one row per (app_key, day), day <= yesterday
-- =============================================================================
CREATE TABLE IF NOT EXISTS daily_app_sums (
    app_key TEXT NOT NULL,
    success BIGINT NOT NULL DEFAULT 0 CHECK (success >= 0),
    failure BIGINT NOT NULL DEFAULT 0 CHECK (failure >= 0),
    day TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_daily_app_sums_day ON daily_app_sums(day);
CREATE INDEX IF NOT EXISTS idx_daily_app_sums_app_day ON daily_app_sums(app_key, day);

-- =============================================================================
-- 2. Today's relay sums: truncated and repopulated each refresh
-- =============================================================================
CREATE TABLE IF NOT EXISTS todays_app_sums (
    app_key TEXT NOT NULL,
    success BIGINT NOT NULL DEFAULT 0 CHECK (success >= 0),
    failure BIGINT NOT NULL DEFAULT 0 CHECK (failure >= 0)
);

-- =============================================================================
-- 3. Today's hourly latency averages: same lifecycle as todays_app_sums
-- =============================================================================
CREATE TABLE IF NOT EXISTS todays_app_latencies (
    app_key TEXT NOT NULL,
    time TIMESTAMPTZ NOT NULL,
    latency DOUBLE PRECISION NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_todays_app_latencies_app ON todays_app_latencies(app_key);

-- =============================================================================
-- 4. Today's per-origin sums: same lifecycle as todays_app_sums
-- =============================================================================
CREATE TABLE IF NOT EXISTS todays_relay_counts (
    origin TEXT NOT NULL,
    success BIGINT NOT NULL DEFAULT 0 CHECK (success >= 0),
    failure BIGINT NOT NULL DEFAULT 0 CHECK (failure >= 0)
);

-- =============================================================================
-- 5. HTTP-ingested counters: upserted by edge nodes, read back as a source
-- =============================================================================
CREATE TABLE IF NOT EXISTS http_source_relay_counts (
    app_key TEXT NOT NULL,
    day TIMESTAMPTZ NOT NULL,
    success BIGINT NOT NULL DEFAULT 0 CHECK (success >= 0),
    error BIGINT NOT NULL DEFAULT 0 CHECK (error >= 0),
    PRIMARY KEY (app_key, day)
);

CREATE INDEX IF NOT EXISTS idx_http_source_relay_counts_day ON http_source_relay_counts(day);
"#;
