//! Unified application error model and mapping helpers.
//! One enum covers every failure the mutation engines and the HTTP surface
//! can report, along with the HTTP status mapping and the JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Session, column, or on-disk file absent.
    NotFound { code: String, message: String },
    /// Action/patch shape rejected by schema validation.
    Schema { code: String, message: String },
    /// Malformed client input that is not a schema violation.
    UserInput { code: String, message: String },
    /// Operation applied to a column of the wrong semantic type, or a value
    /// that cannot be coerced to the column type.
    TypeMismatch { code: String, message: String },
    /// Operator/operation outside the allowed set.
    Unsupported { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::Schema { code, .. }
            | AppError::UserInput { code, .. }
            | AppError::TypeMismatch { code, .. }
            | AppError::Unsupported { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound { message, .. }
            | AppError::Schema { message, .. }
            | AppError::UserInput { message, .. }
            | AppError::TypeMismatch { message, .. }
            | AppError::Unsupported { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn schema(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Schema { code: code.into(), message: msg.into() } }
    pub fn user(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn type_mismatch(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::TypeMismatch { code: code.into(), message: msg.into() } }
    pub fn unsupported(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Unsupported { code: code.into(), message: msg.into() } }
    pub fn io(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Session-not-found with the canonical message used across handlers.
    pub fn session_not_found(id: &str) -> Self {
        AppError::not_found("session_not_found", format!("File with ID '{}' not found.", id))
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::Schema { .. } => 422,
            AppError::UserInput { .. } => 400,
            AppError::TypeMismatch { .. } => 400,
            AppError::Unsupported { .. } => 400,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}

impl From<polars::prelude::PolarsError> for AppError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        // Unclassified table-engine failures surface as a generic server error
        AppError::Internal { code: "table_error".into(), message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "io".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}
