use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bbdata_common::{DateError, DurationError, GranularityError, ValueError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Error kind. One of: `UnauthorizedException`, `BadApikeyException`,
    /// `ForbiddenException`, `ItemNotFoundException`, `WrongParamsException`,
    /// `ForeignKeyException`, `DuplicateFieldException`, `InternalError`.
    #[schema(example = "ItemNotFoundException")]
    pub exception: &'static str,
    /// Human-readable description, or a field -> message map for validation errors.
    #[schema(value_type = Object, example = "The object (id=3) was not found or can't be accessed with this apikey.")]
    pub details: serde_json::Value,
}

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing authorization headers")]
    Unauthorized,
    #[error("{0}")]
    BadApikey(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    ItemNotFound(String),
    #[error("{0}")]
    WrongParams(String),
    #[error("invalid fields: {0:?}")]
    WrongFields(BTreeMap<String, String>),
    #[error("foreign key violation")]
    ForeignKey,
    #[error("value {0} already exists.")]
    DuplicateField(String),
    #[error("{0}")]
    Internal(String),
}

pub const MISSING_HEADERS: &str = "This resource is protected. \
    Missing authorization headers: bbuser=<user_id:int>, bbtoken=<token:string>";

impl AppError {
    /// 404 with the message shared by every lookup that may hide a permission failure.
    pub fn not_found(item: impl std::fmt::Display) -> Self {
        AppError::ItemNotFound(format!(
            "The {item} was not found or can't be accessed with this apikey."
        ))
    }

    pub fn field(name: &str, message: impl Into<String>) -> Self {
        AppError::WrongFields(BTreeMap::from([(name.to_string(), message.into())]))
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let text = |exception, msg: String| ErrorBody {
            exception,
            details: serde_json::Value::String(msg),
        };
        match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                text("UnauthorizedException", MISSING_HEADERS.into()),
            ),
            AppError::BadApikey(msg) => (StatusCode::FORBIDDEN, text("BadApikeyException", msg)),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, text("ForbiddenException", msg)),
            AppError::ItemNotFound(msg) => {
                (StatusCode::NOT_FOUND, text("ItemNotFoundException", msg))
            }
            AppError::WrongParams(msg) => {
                (StatusCode::BAD_REQUEST, text("WrongParamsException", msg))
            }
            AppError::WrongFields(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    exception: "WrongParamsException",
                    details: serde_json::to_value(fields).unwrap_or_default(),
                },
            ),
            AppError::ForeignKey => (
                StatusCode::BAD_REQUEST,
                text(
                    "ForeignKeyException",
                    "A field references a non-existing resource.".into(),
                ),
            ),
            AppError::DuplicateField(value) => (
                StatusCode::BAD_REQUEST,
                text("DuplicateFieldException", format!("value {value} already exists.")),
            ),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    text("InternalError", "An unexpected error occurred".into()),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::DuplicateField(duplicated_value(&detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::ForeignKey,
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// Pull `(value)` out of a Postgres "Key (col)=(value) already exists" detail,
/// falling back to the raw message.
fn duplicated_value(detail: &str) -> String {
    detail
        .split_once(")=(")
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(value, _)| value.to_string())
        .unwrap_or_else(|| detail.to_string())
}

impl From<DateError> for AppError {
    fn from(err: DateError) -> Self {
        AppError::WrongParams(err.to_string())
    }
}

impl From<DurationError> for AppError {
    fn from(err: DurationError) -> Self {
        AppError::WrongParams(err.to_string())
    }
}

impl From<GranularityError> for AppError {
    fn from(err: GranularityError) -> Self {
        AppError::WrongParams(err.to_string())
    }
}

impl From<ValueError> for AppError {
    fn from(err: ValueError) -> Self {
        AppError::WrongParams(err.to_string())
    }
}
