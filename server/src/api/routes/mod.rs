//! API route handlers

pub mod health;
pub mod latency;
pub mod relays;

use std::sync::Arc;

use crate::domain::{IngestService, Meter};

/// Shared state for the metering endpoints
#[derive(Clone)]
pub struct MeterApiState {
    pub meter: Arc<Meter>,
    pub ingest: Arc<IngestService>,
}
