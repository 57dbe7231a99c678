use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::apply::BulkUpdateError;
use crate::audit::AuditError;
use crate::config::ConfigError;
use crate::import::{ExportError, SessionError};
use crate::portfolio::RepositoryError;
use crate::telemetry::TelemetryError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Seed(serde_json::Error),
    Export(ExportError),
    Audit(AuditError),
    BulkUpdate(BulkUpdateError),
    Session(SessionError),
    Repository(RepositoryError),
    NotFound(String),
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_)
            | AppError::Repository(RepositoryError::DevelopmentNotFound(_))
            | AppError::Repository(RepositoryError::UnitNotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::BulkUpdate(BulkUpdateError::Empty)
            | AppError::Audit(AuditError::InvalidToken(_))
            | AppError::Session(SessionError::RowOutOfRange(_)) => StatusCode::BAD_REQUEST,
            AppError::BulkUpdate(BulkUpdateError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Session(_) => StatusCode::CONFLICT,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Seed(_)
            | AppError::Export(_)
            | AppError::Audit(_)
            | AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Seed(err) => write!(f, "portfolio seed error: {err}"),
            AppError::Export(err) => write!(f, "export error: {err}"),
            AppError::Audit(err) => write!(f, "audit error: {err}"),
            AppError::BulkUpdate(err) => write!(f, "{err}"),
            AppError::Session(err) => write!(f, "import session error: {err}"),
            AppError::Repository(err) => write!(f, "portfolio error: {err}"),
            AppError::NotFound(what) => write!(f, "{what} not found"),
            AppError::BadRequest(reason) => write!(f, "bad request: {reason}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Seed(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Audit(err) => Some(err),
            AppError::BulkUpdate(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::NotFound(_) | AppError::BadRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::BulkUpdate(BulkUpdateError::Validation(messages)) => Json(json!({
                "error": "bulk update rejected",
                "details": messages,
            })),
            _ => Json(json!({ "error": self.to_string() })),
        };
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Seed(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<AuditError> for AppError {
    fn from(value: AuditError) -> Self {
        Self::Audit(value)
    }
}

impl From<BulkUpdateError> for AppError {
    fn from(value: BulkUpdateError) -> Self {
        Self::BulkUpdate(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}
