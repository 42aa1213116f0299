//! Result envelope returned across the core boundary.
//!
//! Transport layers serialize this instead of raw errors, so a store fault
//! never crosses the boundary as an uncaught exception.

use serde::Serialize;

use crate::error::{AppError, ErrorKind};

#[derive(Debug, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_kind: None,
            message: None,
        }
    }

    pub fn err(error: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            error_kind: Some(error.kind()),
            message: Some(error.to_string()),
        }
    }
}

impl<T> From<crate::error::Result<T>> for OperationResult<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(data) => OperationResult::ok(data),
            Err(e) => OperationResult::err(&e),
        }
    }
}
