use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::model::{now_ms, AddedResult, Average, Plug, PlugMetrics, Sample};
use crate::error::{Result, StoreError};
use crate::queue::{RequestQueue, DEFAULT_QUEUE_CAPACITY};

mod gateway;
pub mod read;
pub mod registry;
mod tables;
pub mod write;

pub use gateway::{ExecutionStats, Gateway};

/// Entry point to the plug database.
///
/// All reads and writes go through the owned [`RequestQueue`], so callers can
/// share one manager (usually behind an `Arc`) between any number of tasks.
pub struct DbManager {
    queue: RequestQueue,
    stats: Arc<ExecutionStats>,
}

impl DbManager {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening plug database {}", path.to_string_lossy());

        Self::with_capacity(SqliteConnectionManager::file(path), capacity)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_capacity(SqliteConnectionManager::memory(), DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(manager: SqliteConnectionManager, capacity: usize) -> Result<Self> {
        let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let gateway = Gateway::open(manager)?;
        let stats = gateway.stats();
        let queue = RequestQueue::with_capacity(gateway, capacity)?;

        debug!("Request queue ready with capacity {}", queue.capacity());

        Ok(DbManager { queue, stats })
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn execution_stats(&self) -> Arc<ExecutionStats> {
        self.stats.clone()
    }

    /// Stores one reading for `plug_name`, registering the plug if it is new.
    /// Without a timestamp the reading is stamped with the time of this call.
    pub async fn add_result(
        &self,
        plug_name: &str,
        metrics: PlugMetrics,
        timestamp_ms: Option<i64>,
    ) -> Result<AddedResult> {
        //SQLite would store NaN as NULL and break later reads
        if let Some(metric) = metrics.first_non_finite() {
            return Err(StoreError::NonFiniteMetric { metric });
        }

        let plug_name = plug_name.to_string();
        let timestamp_ms = timestamp_ms.unwrap_or_else(now_ms);

        self.queue
            .submit(move |gateway| {
                let plug_id = registry::resolve(gateway, &plug_name)?;
                let result_id = write::insert_result(gateway, plug_id, timestamp_ms, &metrics)?;

                debug!(
                    "Inserted result {} for plug {} at {}",
                    result_id, plug_name, timestamp_ms
                );

                Ok(AddedResult { plug_id, result_id })
            })
            .await
    }

    pub async fn get_plugs(&self) -> Result<Vec<Plug>> {
        self.queue.submit(read::get_plugs).await
    }

    /// Samples of one plug with `start <= timestamp_ms <= end`; a missing
    /// bound leaves that side of the range open.
    pub async fn get_plug_results(
        &self,
        plug_id: i64,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Sample>> {
        let start_ms = start_ms.unwrap_or(i64::MIN);
        let end_ms = end_ms.unwrap_or(i64::MAX);

        self.queue
            .submit(move |gateway| read::get_results_between(gateway, plug_id, start_ms, end_ms))
            .await
    }

    pub async fn get_plug_averages(
        &self,
        plug_id: i64,
        duration_ms: Option<i64>,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Average>> {
        let start_ms = start_ms.unwrap_or(i64::MIN);
        let end_ms = end_ms.unwrap_or(i64::MAX);

        self.queue
            .submit(move |gateway| {
                read::get_averages_between(gateway, plug_id, duration_ms, start_ms, end_ms)
            })
            .await
    }
}
