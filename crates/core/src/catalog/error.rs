//! Errors raised while normalizing backend records.

use thiserror::Error;

/// Why a record could not be turned into a [`crate::Product`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,
    /// A required field is absent or null.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field has an unusable JSON type or an empty value.
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// Field name.
        field: &'static str,
        /// What the field should have been.
        expected: &'static str,
    },
    /// `price` is a string that does not parse as a number.
    #[error("price is not numeric: {0:?}")]
    InvalidPrice(String),
    /// `price` is below zero.
    #[error("price cannot be negative: {0}")]
    NegativePrice(String),
}

/// A backend record that could not be normalized.
///
/// Carries the record's id when it was readable, so a listing can log which
/// row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed product record{}: {reason}", product_id.as_ref().map(|id| format!(" {id}")).unwrap_or_default())]
pub struct MalformedRecordError {
    /// Id of the offending record, if it had a readable one.
    pub product_id: Option<String>,
    /// What was wrong with it.
    pub reason: MalformedReason,
}

impl MalformedRecordError {
    pub(crate) const fn new(product_id: Option<String>, reason: MalformedReason) -> Self {
        Self { product_id, reason }
    }
}
