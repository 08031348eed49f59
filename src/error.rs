//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate view declaration: {0}")]
    DuplicateView(String),
    #[error("config load: {0}")]
    Load(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Unknown table or column.
    #[error("not found: {0}")]
    NotFound(String),
    /// URI path does not follow the `table, id?, table, id?` grammar.
    #[error("malformed path: {0}")]
    MalformedPath(String),
    /// Constraint failure reported by the database, message kept verbatim.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("engine: {0}")]
    Engine(sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) {
                return AppError::ConstraintViolation(db.message().to_string());
            }
        }
        AppError::Engine(e)
    }
}

impl AppError {
    /// Stable machine-readable code, also used in bulk failure reports.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::MalformedPath(_) => "malformed_path",
            AppError::ConstraintViolation(_) => "constraint_violation",
            AppError::Engine(_) => "engine_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedPath(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ConstraintViolation(_) => StatusCode::CONFLICT,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_engine_errors() {
        let e: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(e, AppError::Engine(_)));
        assert_eq!(e.code(), "engine_error");
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::NotFound("t".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::MalformedPath("1/2".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ConstraintViolation("UNIQUE".into()).status(), StatusCode::CONFLICT);
    }
}
