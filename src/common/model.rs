use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column order used by every statement touching the six metrics.
pub const METRIC_COLUMNS: [&str; 6] = [
    "voltage",
    "current",
    "active_power",
    "apparent_power",
    "reactive_power",
    "power_factor",
];

//Labels as the plug prints them, same order as METRIC_COLUMNS
const METRIC_LABELS: [&str; 6] = [
    "Voltage",
    "Current",
    "Active Power",
    "Apparent Power",
    "Reactive Power",
    "Power Factor",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlugMetrics {
    pub voltage: f64,
    pub current: f64,
    pub active_power: f64,
    pub apparent_power: f64,
    pub reactive_power: f64,
    pub power_factor: f64,
}

impl PlugMetrics {
    /// Builds the metrics out of the label/value pairs scraped from a plug.
    /// Every label has to be present, extra ones are ignored.
    pub fn from_readings(readings: &HashMap<String, f64>) -> Result<Self> {
        let mut values = [0.0; 6];

        for (slot, label) in values.iter_mut().zip(METRIC_LABELS) {
            *slot = *readings
                .get(label)
                .ok_or_else(|| anyhow!("Reading \"{}\" is missing from plug response", label))?;
        }

        Ok(Self::from_array(values))
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        let [voltage, current, active_power, apparent_power, reactive_power, power_factor] =
            values;

        PlugMetrics {
            voltage,
            current,
            active_power,
            apparent_power,
            reactive_power,
            power_factor,
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.voltage,
            self.current,
            self.active_power,
            self.apparent_power,
            self.reactive_power,
            self.power_factor,
        ]
    }

    /// Column of the first metric that is NaN or infinite, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        METRIC_COLUMNS
            .iter()
            .zip(self.to_array())
            .find(|(_, value)| !value.is_finite())
            .map(|(column, _)| *column)
    }

    pub(crate) fn from_row(row: &rusqlite::Row<'_>, first_column: usize) -> rusqlite::Result<Self> {
        let mut values = [0.0; 6];
        for (offset, slot) in values.iter_mut().enumerate() {
            *slot = row.get(first_column + offset)?;
        }
        Ok(Self::from_array(values))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plug {
    pub plug_id: i64,
    pub plug_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub result_id: i64,
    pub plug_id: i64,
    pub timestamp_ms: i64,
    #[serde(flatten)]
    pub metrics: PlugMetrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Average {
    pub average_id: i64,
    pub plug_id: i64,
    pub bucket_start_ms: i64,
    pub duration_ms: i64,
    #[serde(flatten)]
    pub metrics: PlugMetrics,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedResult {
    pub plug_id: i64,
    pub result_id: i64,
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
