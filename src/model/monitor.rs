use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

fn default_request_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_aggregation_periods() -> Vec<AggregationPeriod> {
    vec![AggregationPeriod(Duration::from_secs(60))]
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationPeriod(#[serde(with = "humantime_serde")] pub Duration);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(with = "humantime_serde")]
    pub poll_time: Duration,
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    #[serde(default = "default_aggregation_periods")]
    pub aggregation_periods: Vec<AggregationPeriod>,
    /// Plug name to the host (and optional port) it answers on
    pub plugs: BTreeMap<String, String>,
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read config file {}", path.to_string_lossy()))?;

        serde_json::from_str(&config).context("Couldn't parse config file")
    }

    pub fn aggregation_periods(&self) -> Vec<Duration> {
        self.aggregation_periods.iter().map(|period| period.0).collect()
    }

    pub fn validate(&self) -> Result<()> {
        let mut error_string = String::new();

        if self.plugs.is_empty() {
            error_string += "At least one plug has to be configured\n";
        }

        for (name, address) in &self.plugs {
            if name.trim().is_empty() {
                error_string += &format!("Plug with address {} has an empty name\n", address);
            }
            if address.trim().is_empty() {
                error_string += &format!("Plug {} has an empty address\n", name);
            }
        }

        if self.poll_time.is_zero() {
            error_string += "Poll time must be greater than zero\n";
        }

        if self.request_timeout.is_zero() {
            error_string += "Request timeout must be greater than zero\n";
        }

        let mut period_set = HashSet::new();
        for period in self.aggregation_periods() {
            if period.as_millis() == 0 {
                error_string += "Aggregation periods must be at least one millisecond\n";
            } else if !period_set.insert(period) {
                error_string += &format!(
                    "Repeated aggregation period: {:?} was defined more than once\n",
                    period
                );
            }
        }

        if error_string.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(error_string))
        }
    }
}
