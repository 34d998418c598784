use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The core's error taxonomy (spec §7). Every non-2xx HTTP response and
/// every real-time `error`/`access-denied` message is built from one of
/// these.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("rate limited")]
    TooManyRequests,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn not_applied(detail: impl Into<String>) -> Self {
        Error::BadRequest(format!("ChangeNotFound: {}", detail.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured details attached to the uniform error body, when any.
    pub fn details(&self) -> Option<Value> {
        None
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    timestamp: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if matches!(self, Error::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        } else {
            tracing::debug!(error = %self, "request failed");
        }
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            code: status.as_u16(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        use sea_orm::DbErr;
        match &err {
            DbErr::RecordNotFound(msg) => Error::NotFound(msg.clone()),
            DbErr::Query(_) | DbErr::Exec(_) => map_sqlx_error(&err),
            DbErr::Conn(_) => Error::ServiceUnavailable(err.to_string()),
            _ => Error::Internal(anyhow::anyhow!(err.to_string())),
        }
    }
}

fn map_sqlx_error(err: &sea_orm::DbErr) -> Error {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("unique") || lower.contains("duplicate") {
        Error::Conflict(message)
    } else if lower.contains("foreign key") {
        Error::BadRequest(message)
    } else if lower.contains("not null") || lower.contains("check constraint") {
        Error::Validation(message)
    } else if lower.contains("connection") {
        Error::ServiceUnavailable(message)
    } else {
        Error::Internal(anyhow::anyhow!(message))
    }
}
