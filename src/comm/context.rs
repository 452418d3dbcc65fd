use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::comm::parse;
use crate::common::model::{now_ms, PlugMetrics};
use crate::data::DbManager;

/// Polling state for one configured plug.
#[derive(Clone)]
pub struct PlugPollContext {
    name: String,
    url: String,
    client: Client,
    db: Arc<DbManager>,
}

impl PlugPollContext {
    pub fn new(name: String, address: &str, client: Client, db: Arc<DbManager>) -> Self {
        PlugPollContext {
            url: Self::build_url(address),
            name,
            client,
            db,
        }
    }

    //Minimal markup endpoint, the one TasmoAdmin uses as well
    fn build_url(address: &str) -> String {
        let address = address.trim().trim_end_matches('/');

        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{}/?m=1", address)
        } else {
            format!("http://{}/?m=1", address)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_metrics(&self) -> Result<PlugMetrics> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to send http request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read http response")?;

        if status != StatusCode::OK {
            return Err(anyhow!("Got non-200 status {}: {}", status, body));
        }

        let readings = parse::parse_tasmota_markup(&body);

        PlugMetrics::from_readings(&readings).context("Failed to parse poll results")
    }

    /// Polls the plug once and stores the reading, stamped with the time the
    /// poll started.
    pub async fn poll_once(&self) -> Result<()> {
        let started_ms = now_ms();

        let metrics = self.fetch_metrics().await.context("Failed to poll")?;

        let added = self
            .db
            .add_result(&self.name, metrics, Some(started_ms))
            .await
            .context("Failed to save result to database")?;

        debug!(
            "Inserted result {} for plug {}",
            added.result_id, added.plug_id
        );

        Ok(())
    }

    pub async fn poll_loop(self, poll_time: Duration) {
        let mut interval = tokio::time::interval(poll_time);

        info!("Polling {} every {:?}", self.url, poll_time);

        loop {
            interval.tick().await;

            if let Err(err) = self.poll_once().await {
                warn!("Failed to monitor plug {}: {:#}", self.name, err);
            }
        }
    }
}
