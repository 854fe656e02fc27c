//! Centralized error handling for verif_align
//!
//! Every fallible operation in the crate returns [`AlignError`]. Missing numeric
//! data (NaN/Inf) is never an error; it flows through the arrays and is masked
//! out when scores are extracted.

use thiserror::Error;

/// Main error type for alignment operations
#[derive(Debug, Error)]
pub enum AlignError {
    /// Invalid dataset configuration or call arguments (empty intersections,
    /// bad legend length, unknown climatology mode, out-of-range indices)
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A source does not declare the requested field
    #[error("{source_name} does not contain '{field}'")]
    FieldUnavailable { source_name: String, field: String },

    /// An internal invariant did not hold; this is a defect, not bad input
    #[error("internal invariant violated: {message}")]
    InvariantViolation { message: String },

    /// The source collaborator failed to deliver an array
    #[error("failed to load from {source_name}: {message}")]
    SourceLoad { source_name: String, message: String },

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON source document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Thread pool configuration error
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Array shape or dimension error
    #[error("array error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl AlignError {
    /// Creates an `AlignError::Configuration`.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an `AlignError::InvariantViolation`.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }
}

/// Result type alias for alignment operations
pub type Result<T> = std::result::Result<T, AlignError>;
