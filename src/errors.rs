use crate::models::object_name::ObjectName;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

/// Failure categories shared by the media gate and the storage facade.
///
/// Callers branch on the variant; the message is for humans only.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Uploaded bytes are not a decodable image (user-correctable).
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Enhancement or re-encoding produced no usable output.
    #[error("image encoding failed: {0}")]
    EncodingFailed(String),

    #[error("object `{0}` not found")]
    NotFound(ObjectName),

    /// Transport, auth or backend failure talking to the bucket.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type MediaResult<T> = Result<T, MediaError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Every media failure on the fetch path is reported as a server error with
/// the error text as body, including a missing object.
impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::internal(err.to_string())
    }
}
