/// Error types for the engagement service
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("caller is not the owner of this {0}")]
    Forbidden(&'static str),

    #[error("no authenticated identity")]
    Unauthorized,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("post already liked")]
    AlreadyLiked,

    #[error("post not liked yet")]
    NotLiked,

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Stable error discriminant exposed to transport layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unauthorized,
    InvalidInput,
    AlreadyLiked,
    NotLiked,
    StoreFailure,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::AlreadyLiked => ErrorKind::AlreadyLiked,
            AppError::NotLiked => ErrorKind::NotLiked,
            AppError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}
