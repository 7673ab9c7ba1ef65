// Response types for API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::errors::GachaError;

/// Value of `tags.source` on every error body
pub const ERROR_SOURCE: &str = "gacha-api";

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub tags: ErrorTags,
    pub extras: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorTags {
    pub source: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_type: String,
    pub extras: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: String, error_type: &str) -> Self {
        Self {
            status,
            message,
            error_type: error_type.to_string(),
            extras: Map::new(),
        }
    }

    /// Create from GachaError
    pub fn from_gacha_error(err: GachaError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.user_message(),
            error_type: err.error_type().to_string(),
            extras: err.extras(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
            tags: ErrorTags {
                source: ERROR_SOURCE.to_string(),
                error_type: self.error_type,
            },
            extras: self.extras,
        });
        (self.status, body).into_response()
    }
}

impl From<GachaError> for ApiError {
    fn from(err: GachaError) -> Self {
        ApiError::from_gacha_error(err)
    }
}
