//! Domain logic: the collection pipeline and the query-side meter

pub mod collector;
pub mod ingest;
pub mod meter;

pub use collector::Collector;
pub use ingest::IngestService;
pub use meter::{Meter, MeterConfig, MeterError};
