use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::common::model::{now_ms, PlugMetrics};
use crate::data::{read, write, DbManager, Gateway};
use crate::error::{Result, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub bucket_start_ms: i64,
    pub bucket_end_ms: i64,
    pub duration_ms: i64,
    pub inserted: usize,
    pub updated: usize,
}

/// Left aligned `[start, end)` window of width `duration_ms` containing `now_ms`.
pub fn bucket_bounds(now_ms: i64, duration_ms: i64) -> Result<(i64, i64)> {
    if duration_ms <= 0 {
        return Err(StoreError::InvalidDuration(duration_ms));
    }

    let bucket_start = now_ms.saturating_sub(now_ms.rem_euclid(duration_ms));

    Ok((bucket_start, bucket_start.saturating_add(duration_ms)))
}

/// Writes the averages of one bucket for one plug, replacing the stored ones
/// if the bucket was aggregated before. Meant to run as one queued operation.
pub fn upsert_average(
    gateway: &Gateway,
    plug_id: i64,
    bucket_start_ms: i64,
    duration_ms: i64,
    metrics: &PlugMetrics,
) -> Result<UpsertOutcome> {
    let existing = read::find_average_ids(gateway, plug_id, bucket_start_ms, duration_ms)?;

    match existing.as_slice() {
        [] => {
            let average_id =
                write::insert_average(gateway, plug_id, bucket_start_ms, duration_ms, metrics)?;
            Ok(UpsertOutcome::Inserted(average_id))
        }
        [average_id] => {
            write::update_average(gateway, *average_id, metrics)?;
            Ok(UpsertOutcome::Updated(*average_id))
        }
        matches => Err(StoreError::ConsistencyViolation {
            plug_id,
            bucket_start_ms,
            duration_ms,
            matches: matches.len(),
        }),
    }
}

impl DbManager {
    /// Averages the bucket of width `duration` that contains the current time.
    pub async fn average_plug_results(&self, duration: Duration) -> Result<AggregationReport> {
        let duration_ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);

        self.average_plug_results_at(duration_ms, now_ms()).await
    }

    pub async fn average_plug_results_at(
        &self,
        duration_ms: i64,
        now_ms: i64,
    ) -> Result<AggregationReport> {
        let (bucket_start_ms, bucket_end_ms) = bucket_bounds(now_ms, duration_ms)?;

        let means = self
            .queue()
            .submit(move |gateway| read::get_bucket_means(gateway, bucket_start_ms, bucket_end_ms))
            .await?;

        let mut report = AggregationReport {
            bucket_start_ms,
            bucket_end_ms,
            duration_ms,
            ..Default::default()
        };

        let mut first_error = None;

        //A pass holds at most one queue slot at a time
        for mean in means {
            let plug_id = mean.plug_id;
            debug!(
                "Plug {} averaged {} samples in bucket {}",
                plug_id, mean.samples, bucket_start_ms
            );

            let outcome = self
                .queue()
                .submit(move |gateway| {
                    upsert_average(gateway, plug_id, bucket_start_ms, duration_ms, &mean.metrics)
                })
                .await;

            match outcome {
                Ok(UpsertOutcome::Inserted(_)) => report.inserted += 1,
                Ok(UpsertOutcome::Updated(_)) => report.updated += 1,
                Err(err) => {
                    error!("Failed to store average for plug {}: {}", plug_id, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

async fn aggregation_periodic_task(db: Arc<DbManager>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match db.average_plug_results(period).await {
            Ok(report) => info!(
                "Averaged bucket {} ({} ms): {} inserted, {} updated",
                report.bucket_start_ms, report.duration_ms, report.inserted, report.updated
            ),
            Err(err) => error!("Error building {:?} averages: {}", period, err),
        }
    }
}

pub fn start_aggregation_building(db: Arc<DbManager>, periods: Vec<Duration>) -> Vec<JoinHandle<()>> {
    periods
        .into_iter()
        .map(|period| tokio::spawn(aggregation_periodic_task(db.clone(), period)))
        .collect()
}
