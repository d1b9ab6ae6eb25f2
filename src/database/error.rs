use log::error;
use thiserror::Error;
use warp::{http::StatusCode, reject::Reject};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(info: impl Into<String>) -> Self {
        Self::Validation(info.into())
    }

    pub fn conflict(info: impl Into<String>) -> Self {
        Self::Conflict(info.into())
    }

    pub fn not_found(info: impl Into<String>) -> Self {
        Self::NotFound(info.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reject for ApiError {}

/// Uniqueness races and constraint checks reach the caller as regular
/// client errors; everything else is logged and hidden behind a 500.
impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::not_found("Object not found"),
            sqlx::Error::Database(e) => match e.code().as_deref() {
                Some(UNIQUE_VIOLATION) => Self::conflict(match e.constraint() {
                    Some(constraint) => format!("Object already exists ({constraint})"),
                    None => String::from("Object already exists"),
                }),
                Some(FOREIGN_KEY_VIOLATION) => {
                    Self::validation("Referenced object does not exist or is still in use")
                }
                Some(CHECK_VIOLATION) => Self::validation(match e.constraint() {
                    Some(constraint) => format!("Constraint violated ({constraint})"),
                    None => String::from("Constraint violated"),
                }),
                _ => {
                    error!("Database error: {e}");
                    Self::Internal(String::from("Internal server error"))
                }
            },
            sqlx::Error::PoolTimedOut => {
                error!("Pool timed out");
                Self::Internal(String::from("Database is unavailable"))
            }
            e => {
                error!("Query failed: {e}");
                Self::Internal(String::from("Internal server error"))
            }
        }
    }
}
