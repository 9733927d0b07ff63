//! Error responses for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::detect::PredictError;
use crate::features::ValidationError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// The submitted record failed validation.
    Invalid(ValidationError),
    /// The request body is not a JSON object.
    BadRequest(String),
    /// The model could not produce a prediction.
    Prediction(String),
    /// Storage or runtime failure.
    Internal(String),
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(e) => ApiError::Invalid(e),
            PredictError::Classifier(e) => ApiError::Prediction(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Invalid(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "kind": e.kind(),
                    "field": e.field(),
                    "value": e.value(),
                    "message": e.to_string(),
                }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "kind": "bad_request", "message": msg }),
            ),
            ApiError::Prediction(msg) => {
                tracing::error!("Model prediction failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "kind": "prediction_failed", "message": "model prediction failed" }),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "kind": "internal", "message": "internal server error" }),
                )
            }
        };

        (status, Json(json!({ "error": body }))).into_response()
    }
}
