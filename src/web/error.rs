//! Error handling for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chem::FormulaError;
use crate::export::ExportError;
use crate::state::DbError;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Internal server error.
    Internal(String),
    /// Bad request.
    BadRequest(String),
    /// Not found.
    NotFound(String),
    /// The write collides with an existing row.
    Conflict(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        };

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => AppError::NotFound(err.to_string()),
            DbError::ConstraintViolation(_) => AppError::Conflict(err.to_string()),
            DbError::Formula(e) => e.into(),
            DbError::InvalidInput(msg) => AppError::BadRequest(msg),
            other => {
                log::error!("Database failure: {}", other);
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl From<FormulaError> for AppError {
    fn from(err: FormulaError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(format!("Export failed: {}", err))
    }
}
