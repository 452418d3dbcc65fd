use axum::{extract::State, response::Response, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{common, ApiState};

pub async fn list_plugs(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, Response> {
    let plugs = state
        .db
        .get_plugs()
        .await
        .map_err(common::store_error_response)?;

    Ok(Json(json!({ "data": { "plugs": plugs } })))
}
