//! PostgreSQL database service
//!
//! Centralized management of the durable relay usage store:
//! - Connection pooling with min/max bounds
//! - Idle connection cleanup and connection lifetime cycling
//! - Statement timeout protection
//!
//! All schema definitions and migrations are managed here.

pub mod error;
pub mod http_source;
mod migrations;
pub mod repositories;
mod repository_impl;
pub mod schema;

pub use error::PostgresError;
pub use http_source::HttpRelaySource;
pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::core::config::PostgresConfig;
use crate::core::constants::{
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
};

/// PostgreSQL database service
///
/// Handles database initialization and connection pooling. Created once at
/// process startup and shared by every component that touches the durable
/// store; implements both the reporter and writer roles of the store
/// contract.
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    /// Initialize the database service from configuration
    ///
    /// Creates a connection pool with production-oriented settings:
    /// - Min connections kept warm for low latency
    /// - Idle timeout to release unused connections
    /// - Max lifetime to cycle connections and prevent stale state
    /// - Statement timeout to prevent runaway queries
    pub async fn init(config: &PostgresConfig) -> Result<Self, PostgresError> {
        if config.url.is_empty() {
            return Err(PostgresError::Config("PostgreSQL URL is required".into()));
        }

        let max_connections = if config.max_connections > 0 {
            config.max_connections
        } else {
            POSTGRES_DEFAULT_MAX_CONNECTIONS
        };

        let min_connections = if config.min_connections > 0 {
            config.min_connections
        } else {
            POSTGRES_DEFAULT_MIN_CONNECTIONS
        };

        let options: PgConnectOptions = config
            .url
            .parse::<PgConnectOptions>()
            .map_err(|e: sqlx::Error| PostgresError::Config(e.to_string()))?
            .options([(
                "statement_timeout",
                format!("{}s", POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
            )]);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS))
            .max_lifetime(Duration::from_secs(POSTGRES_DEFAULT_MAX_LIFETIME_SECS))
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            max_connections,
            min_connections,
            "PostgreSQL pool initialized"
        );

        Ok(Self { pool })
    }

    /// Access to the underlying pool for repository functions
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all pool connections; called once during graceful shutdown
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}
