//! Unified API error type.
//!
//! Every handler returns `Result<_, ApiError>`; the [`IntoResponse`]
//! impl is the single place where error kinds are mapped to HTTP status
//! codes and JSON bodies. Validation errors carry a per-field message
//! map and serialize as `{"field": "message", ...}`; everything else
//! serializes as `{"error": "message"}`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Field name → human-readable message, ordered for stable output.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body failed validation. Maps to 400 with a field-level body.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// Malformed or missing query parameter / path input. Maps to 400.
    #[error("{0}")]
    BadRequest(String),

    /// Unknown resource id. Maps to 404.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Operation the resource does not support. Maps to 405.
    #[error("{0}")]
    MethodNotSupported(&'static str),

    /// External drug-info lookup failed. Maps to 502 with an error payload
    /// rather than propagating as a mapping-layer fault.
    #[error("{0}")]
    Upstream(String),

    /// Database failure. Maps to 500; the underlying error is logged but
    /// never leaked to the client.
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Single-field validation error.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.into(), message.into());
        Self::Validation(fields)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

impl From<crate::adherence::AdherenceError> for ApiError {
    fn from(err: crate::adherence::AdherenceError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                serde_json::to_value(fields).unwrap_or_else(|_| json!({})),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{} not found", what) }),
            ),
            ApiError::MethodNotSupported(msg) => {
                (StatusCode::METHOD_NOT_ALLOWED, json!({ "error": msg }))
            }
            ApiError::Upstream(msg) => {
                (StatusCode::BAD_GATEWAY, json!({ "error": msg }))
            }
            ApiError::Database(err) => {
                tracing::error!("database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
