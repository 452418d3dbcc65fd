mod monitor;

pub use monitor::{AggregationPeriod, MonitorConfig};
