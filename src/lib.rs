pub mod aggregations;
pub mod api;
pub mod comm;
pub mod common;
pub mod data;
pub mod error;
pub mod model;
pub mod queue;

pub use aggregations::AggregationReport;
pub use common::model::{AddedResult, Average, Plug, PlugMetrics, Sample};
pub use data::DbManager;
pub use error::StoreError;
