//! Result and error types for the core library

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use super::{CurrencyCode, YearMonth};

/// Core library error type
///
/// Every fault is raised at the point of violation. Operations that fail
/// leave the entity untouched.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Capacity for {0} already exists")]
    DuplicateMonth(YearMonth),

    #[error("No capacity planned for {0}")]
    MonthNotFound(YearMonth),

    #[error("Cost item not found: {0}")]
    ItemNotFound(String),

    #[error("Capacity plan is empty")]
    EmptyPlan,

    #[error("Invalid range: {start} is after {end}")]
    InvalidRange { start: YearMonth, end: YearMonth },

    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        found: CurrencyCode,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an item not found error
    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::ItemNotFound(id.into())
    }

    /// Create a currency mismatch error
    pub fn currency_mismatch(expected: CurrencyCode, found: CurrencyCode) -> Self {
        Self::CurrencyMismatch { expected, found }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// JSON envelope for the outcome of one operation
///
/// `data` and `error` are mutually exclusive; absent fields are omitted
/// from the serialized form.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self::with_parts(Some(data), None)
    }

    /// A successful result carrying extra named values next to `data`
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        let mut result = Self::ok(data);
        result.context = Some(context);
        result
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self::with_parts(None, Some(error.into()))
    }

    fn with_parts(data: Option<T>, error: Option<String>) -> Self {
        Self {
            success: error.is_none(),
            data,
            error,
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        result.map_or_else(|e| Self::fail(e.to_string()), Self::ok)
    }
}
