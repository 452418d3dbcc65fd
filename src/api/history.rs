use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{common, ApiState};

/// Millisecond timestamps, both ends inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    start: Option<i64>,
    end: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AverageParams {
    duration: Option<i64>,
    start: Option<i64>,
    end: Option<i64>,
}

pub async fn get_plug_results(
    Path(plug_id): Path<i64>,
    Query(params): Query<RangeParams>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Value>, Response> {
    let results = state
        .db
        .get_plug_results(plug_id, params.start, params.end)
        .await
        .map_err(common::store_error_response)?;

    Ok(Json(json!({ "data": { "results": results } })))
}

pub async fn get_plug_averages(
    Path(plug_id): Path<i64>,
    Query(params): Query<AverageParams>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Value>, Response> {
    let averages = state
        .db
        .get_plug_averages(plug_id, params.duration, params.start, params.end)
        .await
        .map_err(common::store_error_response)?;

    Ok(Json(json!({ "data": { "averages": averages } })))
}
