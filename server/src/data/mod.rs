//! Data layer: store contracts, backend drivers and domain types
//!
//! PostgreSQL is the durable relay usage store (reporter + writer roles),
//! ClickHouse is the upstream telemetry source, and the portal identity
//! service resolves application ownership. Domain components depend only on
//! the traits in [`traits`].

pub mod error;
pub mod portal;
pub mod postgres;
pub mod telemetry;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use portal::{PortalClient, PortalError};
pub use postgres::{HttpRelaySource, PostgresService};
pub use telemetry::TelemetryService;
