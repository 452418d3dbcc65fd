use rusqlite::params;

use crate::common::model::{Average, Plug, PlugMetrics, Sample};
use crate::data::Gateway;
use crate::error::Result;

/// Per plug means over one bucket, as computed by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketMean {
    pub plug_id: i64,
    pub samples: i64,
    pub metrics: PlugMetrics,
}

pub fn get_plugs(gateway: &Gateway) -> Result<Vec<Plug>> {
    gateway.query(
        "SELECT plug_id, plug_name FROM plug ORDER BY plug_id;",
        [],
        |row| {
            Ok(Plug {
                plug_id: row.get(0)?,
                plug_name: row.get(1)?,
            })
        },
    )
}

pub fn get_results_between(
    gateway: &Gateway,
    plug_id: i64,
    start_ms: i64,
    end_ms: i64,
) -> Result<Vec<Sample>> {
    gateway.query(
        "SELECT result_id, plug_id, timestamp_ms,
                voltage, current, active_power, apparent_power, reactive_power, power_factor
         FROM result
         WHERE plug_id = ?1
           AND timestamp_ms BETWEEN ?2 AND ?3
         ORDER BY timestamp_ms, result_id;",
        params![plug_id, start_ms, end_ms],
        |row| {
            Ok(Sample {
                result_id: row.get(0)?,
                plug_id: row.get(1)?,
                timestamp_ms: row.get(2)?,
                metrics: PlugMetrics::from_row(row, 3)?,
            })
        },
    )
}

pub fn get_averages_between(
    gateway: &Gateway,
    plug_id: i64,
    duration_ms: Option<i64>,
    start_ms: i64,
    end_ms: i64,
) -> Result<Vec<Average>> {
    gateway.query(
        "SELECT average_id, plug_id, bucket_start_ms, duration_ms,
                voltage, current, active_power, apparent_power, reactive_power, power_factor
         FROM average
         WHERE plug_id = ?1
           AND bucket_start_ms BETWEEN ?2 AND ?3
           AND (?4 IS NULL OR duration_ms = ?4)
         ORDER BY bucket_start_ms, duration_ms, average_id;",
        params![plug_id, start_ms, end_ms, duration_ms],
        |row| {
            Ok(Average {
                average_id: row.get(0)?,
                plug_id: row.get(1)?,
                bucket_start_ms: row.get(2)?,
                duration_ms: row.get(3)?,
                metrics: PlugMetrics::from_row(row, 4)?,
            })
        },
    )
}

/// Means of every metric over `[start_ms, end_ms)`, one row per plug with samples.
pub fn get_bucket_means(gateway: &Gateway, start_ms: i64, end_ms: i64) -> Result<Vec<BucketMean>> {
    gateway.query(
        "SELECT plug_id, COUNT(*),
                AVG(voltage), AVG(current), AVG(active_power),
                AVG(apparent_power), AVG(reactive_power), AVG(power_factor)
         FROM result
         WHERE timestamp_ms >= ?1
           AND timestamp_ms < ?2
         GROUP BY plug_id
         ORDER BY plug_id;",
        params![start_ms, end_ms],
        |row| {
            Ok(BucketMean {
                plug_id: row.get(0)?,
                samples: row.get(1)?,
                metrics: PlugMetrics::from_row(row, 2)?,
            })
        },
    )
}

pub fn find_average_ids(
    gateway: &Gateway,
    plug_id: i64,
    bucket_start_ms: i64,
    duration_ms: i64,
) -> Result<Vec<i64>> {
    gateway.query(
        "SELECT average_id
         FROM average
         WHERE plug_id = ?1
           AND bucket_start_ms = ?2
           AND duration_ms = ?3;",
        params![plug_id, bucket_start_ms, duration_ms],
        |row| row.get(0),
    )
}
