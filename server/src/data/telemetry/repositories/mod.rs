//! ClickHouse repositories

pub mod relays;
