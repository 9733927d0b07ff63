//! API route definitions.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::features::RawInput;

pub const USER_HEADER: &str = "x-user-id";

const DEFAULT_HISTORY: usize = 20;
const MAX_HISTORY: usize = 500;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/schema", get(schema))
        .route("/predict", post(predict))
        .route("/detections", get(list_detections))
        .route("/statistics", get(statistics))
}

fn meta() -> Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.detector.model_kind()
        },
        "meta": meta()
    }))
}

async fn schema(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": state.detector.describe(),
        "meta": meta()
    }))
}

/// JSON scalars become the string a form would have submitted; nulls count
/// as absent.
fn field_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn raw_input(body: &Map<String, Value>) -> RawInput {
    body.iter()
        .filter_map(|(name, value)| field_value(value).map(|v| (name.clone(), v)))
        .collect()
}

fn user_id(headers: &HeaderMap, default_user: &str) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default_user)
        .to_string()
}

async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = raw_input(&body);
    let user = user_id(&headers, &state.default_user);

    let result = state.detector.predict(&input)?;

    let log = state.detections.clone();
    let saved = result.clone();
    let owner = user.clone();
    let detection_id = match tokio::task::spawn_blocking(move || log.record(&saved, &owner)).await {
        Ok(Ok(id)) => Some(id),
        Ok(Err(e)) => {
            warn!(error = %e, user = %user, "Failed to persist detection");
            None
        }
        Err(e) => {
            warn!(error = %e, "Persistence task failed");
            None
        }
    };

    Ok(Json(json!({
        "data": {
            "prediction": result.label,
            "confidence": result.confidence,
            "predicted_class_id": result.predicted_class_id,
            "probabilities": result.probabilities,
            "detection_id": detection_id
        },
        "meta": {
            "persisted": detection_id.is_some(),
            "user_id": user,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    })))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn list_detections(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
    let log = state.detections.clone();
    let records = tokio::task::spawn_blocking(move || log.list_recent(limit))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let total = records.len();
    Ok(Json(json!({
        "data": records,
        "meta": { "total": total, "limit": limit }
    })))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    user: Option<String>,
}

async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Value>> {
    let log = state.detections.clone();
    let user = query.user.clone();
    let stats = tokio::task::spawn_blocking(move || log.stats(user.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(json!({
        "data": stats,
        "meta": {
            "user_id": query.user,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    })))
}
