//! Grid Errors
//!
//! Validation and protocol errors are contained where they are detected.
//! Invariant errors point at a defect upstream and are propagated.

use thiserror::Error;

/// Malformed item, query or filter data. Recoverable: skip and continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("item data is not a JSON object")]
    NotAnObject,
    #[error("field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{0}` must be a non-empty string")]
    EmptyField(&'static str),
    #[error("field `{field}` is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("field `priceCents` must be a non-negative integer")]
    InvalidPrice,
    #[error("search string must not be empty")]
    EmptySearchString,
    #[error("filter {category_type}={category_id} is not offered by the catalog")]
    UnknownFilter {
        category_type: String,
        category_id: String,
    },
    #[error("filter menu template is malformed: {0}")]
    MalformedTemplate(String),
}

/// A catalog fetch that could not be turned into a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("catalog responded with HTTP {0}")]
    Status(u16),
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
    #[error("catalog request failed: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Decode(err.to_string())
    }
}

/// A request object that breaks the range contract reached a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateInvariantError {
    #[error("request start index {0} is negative")]
    NegativeStart(i64),
    #[error("request length {0} must be positive")]
    NonPositiveLength(i64),
}

/// Errors escaping controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error(transparent)]
    Invariant(#[from] StateInvariantError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
