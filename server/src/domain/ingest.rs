//! Ingest writer for edge-posted relay counters
//!
//! Edge nodes post per-app counters over HTTP; this service truncates their
//! day to midnight and hands them to the durable store. Concurrent calls
//! serialize on a process-local mutex: contended upserts on the same
//! `(app_key, day)` keys can deadlock in the store, and a single API-server
//! instance holds the authoritative ingest path in the current deployment.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::data::error::DataError;
use crate::data::traits::UsageWriter;
use crate::data::types::IngestRecord;
use crate::utils::time::start_of_day;

pub struct IngestService {
    writer: Arc<dyn UsageWriter>,
    write_lock: Mutex<()>,
}

impl IngestService {
    pub fn new(writer: Arc<dyn UsageWriter>) -> Self {
        Self {
            writer,
            write_lock: Mutex::new(()),
        }
    }

    /// Persist a batch of edge-posted counters, one write in flight at a
    /// time. The store's error is returned verbatim.
    pub async fn write_ingest_counts(
        &self,
        mut records: Vec<IngestRecord>,
    ) -> Result<(), DataError> {
        for record in &mut records {
            record.day = start_of_day(record.day);
        }

        let _guard = self.write_lock.lock().await;
        self.writer.write_ingest_counts(&records).await
    }
}
