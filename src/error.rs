use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token acquisition failed: {0}")]
    Auth(String),

    #[error("Partition {partition} fetch failed: {reason}")]
    Partition { partition: String, reason: String },

    #[error("Invalid criteria: {0}")]
    Validation(#[from] CriteriaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// A single sale record that could not be turned into unit rows.
/// Scoped to the offending record; the rest of the batch proceeds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("noOfUnits {0:?} is not a unit count between 0 and {max}", max = crate::config::MAX_UNITS_PER_SALE)]
    UnitCount(String),

    #[error("sub-transaction is not an object: {0}")]
    NotAnObject(String),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("field {field} has non-numeric value {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("area must be positive, got {0}")]
    NonPositiveArea(f64),

    #[error("contractDate {0:?} is not MMYY")]
    ContractDate(String),

    #[error("malformed tenure {text:?}: {reason}")]
    Tenure { text: String, reason: String },
}

/// Query criteria rejected before any row is scanned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("{field} must be a number, got {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} must be one of {expected}, got {value:?}")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}
