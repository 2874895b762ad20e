//! Unified error type for data layer
//!
//! Wraps backend-specific errors from the durable store (PostgreSQL), the
//! telemetry store (ClickHouse), and the portal identity service while
//! preserving which backend produced the failure.

use thiserror::Error;

use crate::data::portal::PortalError;
use crate::data::postgres::PostgresError;
use crate::data::telemetry::TelemetryError;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// PostgreSQL database error (durable store)
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// ClickHouse database error (telemetry store)
    #[error("ClickHouse error: {0}")]
    Clickhouse(#[from] clickhouse::error::Error),

    /// Portal identity service error
    #[error("portal API error: {0}")]
    Portal(PortalError),

    /// Migration failed
    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) | Self::MigrationFailed { .. } => "postgres",
            Self::Clickhouse(_) => "clickhouse",
            Self::Portal(_) => "portal",
            Self::Config(_) | Self::Io(_) => "unknown",
        }
    }
}

impl From<PostgresError> for DataError {
    fn from(e: PostgresError) -> Self {
        match e {
            PostgresError::Database(e) => Self::Postgres(e),
            PostgresError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                version,
                name,
                error,
            },
            PostgresError::Config(msg) => Self::Config(msg),
        }
    }
}

impl From<TelemetryError> for DataError {
    fn from(e: TelemetryError) -> Self {
        match e {
            TelemetryError::Database(e) => Self::Clickhouse(e),
            TelemetryError::Config(msg) => Self::Config(msg),
        }
    }
}

impl From<PortalError> for DataError {
    fn from(e: PortalError) -> Self {
        Self::Portal(e)
    }
}
