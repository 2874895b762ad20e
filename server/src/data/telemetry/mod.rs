//! ClickHouse telemetry service
//!
//! Read-only client for the upstream time-series store holding relay
//! buckets: completed-day sums, current-day partials, per-origin sums and
//! hourly latency averages. Uses async HTTP connections with LZ4
//! compression and keep-alive connection reuse.

pub mod error;
pub mod repositories;
mod source_impl;

pub use error::TelemetryError;

use clickhouse::Client;

use crate::core::config::ClickhouseConfig;

/// ClickHouse telemetry service
///
/// Holds the configured client; the collector consumes it through the
/// source contract. Connections are established lazily per query.
pub struct TelemetryService {
    client: Client,
}

impl TelemetryService {
    /// Initialize the telemetry client from configuration
    pub fn init(config: &ClickhouseConfig) -> Result<Self, TelemetryError> {
        if config.url.is_empty() {
            return Err(TelemetryError::Config("ClickHouse URL is required".into()));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.user {
            client = client.with_user(user);
        }
        if let Some(ref password) = config.password {
            client = client.with_password(password);
        }

        // LZ4 keeps bucket scans cheap on the wire
        client = client.with_compression(clickhouse::Compression::Lz4);

        tracing::debug!(url = %config.url, database = %config.database, "ClickHouse client initialized");

        Ok(Self { client })
    }

    /// Access to the underlying client for repository functions
    pub fn client(&self) -> &Client {
        &self.client
    }
}
