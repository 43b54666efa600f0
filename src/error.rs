#[cfg(feature = "server")]
use axum::http::StatusCode;
#[cfg(feature = "server")]
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The persisted interval file is corrupt or not an interval file at all.
    #[error("malformed interval file: {0}")]
    Format(String),

    /// A backing source failed to deliver records; retrying may succeed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("source closed: {0}")]
    Closed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Failures worth retrying. Covered ranges from before the failure are kept,
    /// so a retry only repeats the sub-range that failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Io(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    fn error_type(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::InvalidInput(_) => "InvalidInput",
            Error::InvalidRange(_) => "InvalidRange",
            Error::Format(_) => "MalformedFile",
            Error::Fetch(_) => "FetchFailed",
            Error::Cancelled => "Cancelled",
            Error::Closed(_) => "SourceClosed",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    #[cfg(feature = "server")]
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::InvalidRange(_) => StatusCode::BAD_REQUEST,
            Error::Fetch(_) => StatusCode::BAD_GATEWAY,
            Error::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Error::Closed(_) => StatusCode::GONE,
            Error::Format(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        ErrorResponse {
            error: ErrorBody {
                kind: error.error_type(),
                message: error.to_string(),
            },
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        (self.status_code(), axum::Json(body)).into_response()
    }
}
