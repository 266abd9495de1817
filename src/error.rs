//! Error types for FCI.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Field-level validation errors.
///
/// Maps a field name to every message raised against it. Messages keep the
/// order in which the rules produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Append every message from another error set.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    /// Append the errors of fields that have no message yet.
    ///
    /// A field that failed to decode keeps only that failure.
    pub fn merge_unreported(&mut self, other: FieldErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_insert(messages);
        }
    }

    /// Check if no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for a field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Iterate over fields and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Convert into a plain map.
    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }

    /// `Ok(())` when empty, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FciError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Common error type for FCI.
#[derive(Error, Debug)]
pub enum FciError {
    /// Database error.
    ///
    /// Errors from sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more fields failed validation.
    #[error("validation error: {0}")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The operation conflicts with the current state of the tree.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The stored tree violates a structural invariant.
    #[error("tree integrity error: {0}")]
    Integrity(String),

    /// Stored metadata could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FciError {
    fn from(e: sqlx::Error) -> Self {
        FciError::Database(e.to_string())
    }
}

/// Result type alias for FCI operations.
pub type Result<T> = std::result::Result<T, FciError>;
