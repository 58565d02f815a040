//! Typed errors and HTTP mapping.

use crate::schema::RunStats;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("duplicate schema level rank: {0}")]
    DuplicateLevel(u32),
    #[error("duplicate unit '{unit}' in level {level}")]
    DuplicateUnit { level: u32, unit: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("state lock poisoned")]
    Poisoned,
}

/// A critical unit failed while the initializer ran with `stop_on_error`.
/// Units not yet attempted were left unexecuted; `stats` covers only attempted units.
#[derive(Error, Debug)]
#[error("critical bootstrap unit '{unit_name}' (level {level}) failed: {message}")]
pub struct CriticalBootstrapFailure {
    pub unit_name: String,
    pub level: u32,
    pub message: String,
    pub stats: RunStats,
}

/// Structural defects in the route registry. Always fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("route group '{group}': entry '{path}' has no attachable handler")]
    InvalidHandler { group: String, path: String },
    #[error("route group '{group}': invalid relative path '{path}'")]
    InvalidPath { group: String, path: String },
    #[error("duplicate route: {path}")]
    DuplicateRoute { path: String },
    #[error("route {path} overlaps the router nested at {nested}")]
    OverlappingRoute { path: String, nested: String },
    #[error("route prefix must be empty or start with '/': '{0}'")]
    InvalidPrefix(String),
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

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Poisoned => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
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
    fn not_found_maps_to_404() {
        let resp = AppError::NotFound("listing 7".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let resp = AppError::Db(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn route_errors_name_the_offender() {
        let err = RouteError::DuplicateRoute {
            path: "/api/v1/listings".into(),
        };
        assert_eq!(err.to_string(), "duplicate route: /api/v1/listings");
        let err = RouteError::InvalidHandler {
            group: "chat".into(),
            path: "/chat-flows".into(),
        };
        assert!(err.to_string().contains("chat-flows"));
        assert!(err.to_string().contains("chat"));
        let err = RouteError::OverlappingRoute {
            path: "/api/v1/listings/:id".into(),
            nested: "/api/v1/listings".into(),
        };
        assert_eq!(
            err.to_string(),
            "route /api/v1/listings/:id overlaps the router nested at /api/v1/listings"
        );
    }
}
