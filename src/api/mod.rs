use anyhow::{Context, Result};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::data::DbManager;

mod common;
mod history;
mod plug;

pub struct ApiState {
    pub db: Arc<DbManager>,
}

async fn log_request(request: Request, next: Next) -> Response {
    info!("{} {}", request.method(), request.uri());

    next.run(request).await
}

pub fn build_router(db: Arc<DbManager>) -> Router {
    let state = Arc::new(ApiState { db });

    let api = Router::new()
        .route("/plug", get(plug::list_plugs))
        .route("/plug_results/{id}", get(history::get_plug_results))
        .route("/plug_averages/{id}", get(history::get_plug_averages))
        .fallback(common::not_found)
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .fallback(common::not_found)
        .layer(middleware::from_fn(log_request))
}

pub async fn serve_api(db: Arc<DbManager>, port: u16) -> Result<JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Couldn't bind api to {}", addr))?;

    info!("Serving api on {}", addr);

    let api = build_router(db);

    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, api).await {
            error!("Api server stopped: {}", err);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::model::PlugMetrics;
    use axum::{
        extract::{Path, Query, State},
        http::{StatusCode, Uri},
    };
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ok_body(result: std::result::Result<axum::Json<Value>, Response>) -> Value {
        match result {
            Ok(axum::Json(body)) => body,
            Err(response) => panic!("request failed with {}", response.status()),
        }
    }

    fn state(db: DbManager) -> Arc<ApiState> {
        Arc::new(ApiState { db: Arc::new(db) })
    }

    #[tokio::test]
    async fn plugs_are_wrapped_in_data_envelope() {
        let state = state(DbManager::open_in_memory().unwrap());
        state
            .db
            .add_result("desk", PlugMetrics::default(), Some(1))
            .await
            .unwrap();

        let body = ok_body(plug::list_plugs(State(state)).await);

        assert_eq!(body["data"]["plugs"][0]["plug_name"], "desk");
        assert_eq!(body["data"]["plugs"][0]["plug_id"], 1);
    }

    #[tokio::test]
    async fn results_honour_query_range() {
        let state = state(DbManager::open_in_memory().unwrap());
        for timestamp_ms in [999, 1000, 2000, 2001] {
            state
                .db
                .add_result("desk", PlugMetrics::default(), Some(timestamp_ms))
                .await
                .unwrap();
        }

        let uri: Uri = "/api/plug_results/1?start=1000&end=2000".parse().unwrap();
        let params: Query<history::RangeParams> = Query::try_from_uri(&uri).unwrap();
        let body = ok_body(history::get_plug_results(Path(1), params, State(state)).await);

        let timestamps: Vec<i64> = body["data"]["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|result| result["timestamp_ms"].as_i64().unwrap())
            .collect();
        assert_eq!(timestamps, vec![1000, 2000]);
    }

    #[tokio::test]
    async fn full_queue_is_service_unavailable() {
        let db = DbManager::with_capacity(r2d2_sqlite::SqliteConnectionManager::memory(), 1)
            .unwrap();
        let (release, gate) = std::sync::mpsc::channel::<()>();
        let blocker = db
            .queue()
            .enqueue(move |_| {
                let _ = gate.recv();
                Ok(())
            })
            .unwrap();

        let state = state(db);
        let Err(response) = plug::list_plugs(State(state)).await else {
            panic!("full queue should reject the request");
        };

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["status"], 503);

        release.send(()).unwrap();
        blocker.wait().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_paths_get_error_envelope() {
        let response = common::not_found("/api/nothing".parse().unwrap()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Not Found");
        assert!(body["error"]["details"]
            .as_str()
            .unwrap()
            .contains("/api/nothing"));
    }
}
