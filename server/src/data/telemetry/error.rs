//! ClickHouse telemetry store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Database error: {0}")]
    Database(#[from] clickhouse::error::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
