use rusqlite::params;
use sql_builder::SqlBuilder;

use crate::common::model::{PlugMetrics, METRIC_COLUMNS};
use crate::data::Gateway;
use crate::error::{Result, StoreError};

fn build_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidStatement(err.to_string())
}

//INSERT with one positional placeholder per column, key columns first and metrics after
fn insert_template(table: &str, key_columns: &[&str]) -> Result<String> {
    let mut fields = key_columns.to_vec();
    fields.extend(METRIC_COLUMNS);

    let placeholders = vec!["?"; fields.len()];

    SqlBuilder::insert_into(table)
        .fields(fields.as_slice())
        .values(placeholders.as_slice())
        .sql()
        .map_err(build_error)
}

pub fn insert_result(
    gateway: &Gateway,
    plug_id: i64,
    timestamp_ms: i64,
    metrics: &PlugMetrics,
) -> Result<i64> {
    let template = insert_template("result", &["plug_id", "timestamp_ms"])?;
    let [m0, m1, m2, m3, m4, m5] = metrics.to_array();

    gateway.insert(
        &template,
        params![plug_id, timestamp_ms, m0, m1, m2, m3, m4, m5],
    )
}

pub fn insert_average(
    gateway: &Gateway,
    plug_id: i64,
    bucket_start_ms: i64,
    duration_ms: i64,
    metrics: &PlugMetrics,
) -> Result<i64> {
    let template = insert_template("average", &["plug_id", "bucket_start_ms", "duration_ms"])?;
    let [m0, m1, m2, m3, m4, m5] = metrics.to_array();

    gateway.insert(
        &template,
        params![plug_id, bucket_start_ms, duration_ms, m0, m1, m2, m3, m4, m5],
    )
}

pub fn update_average(gateway: &Gateway, average_id: i64, metrics: &PlugMetrics) -> Result<usize> {
    let mut builder = SqlBuilder::update_table("average");

    for (i, column) in METRIC_COLUMNS.iter().enumerate() {
        builder.set(column, format!("?{}", i + 1));
    }

    let template = builder
        .and_where(format!("average_id = ?{}", METRIC_COLUMNS.len() + 1))
        .sql()
        .map_err(build_error)?;

    let [m0, m1, m2, m3, m4, m5] = metrics.to_array();

    gateway.execute(&template, params![m0, m1, m2, m3, m4, m5, average_id])
}
