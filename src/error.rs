//! Error types for label model operations.

use thiserror::Error;

/// Errors raised while registering, parsing, editing or exporting labels.
#[derive(Error, Debug)]
pub enum LabelError {
    /// Two distinct labels claim the same identifier
    #[error("Duplicate object id '{id}'")]
    DuplicateId {
        /// The conflicting identifier
        id: String,
    },

    /// Unrecognised `label_type` discriminator
    #[error("Unknown label type '{label_type}'")]
    UnknownLabelType {
        /// The discriminator that was encountered
        label_type: String,
    },

    /// Missing or ill-typed field in label JSON
    #[error("Malformed label JSON: {message}")]
    MalformedJson {
        /// Description of the problem
        message: String,
    },

    /// The annotation set is locked by another actor
    #[error("Labels are locked by {}", locked_by.as_deref().unwrap_or("another user"))]
    LabelsLocked {
        /// Current lock holder, if known
        locked_by: Option<String>,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure writing a NumPy array
    #[error("NPY write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    /// Failure reading a NumPy array
    #[error("NPY read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),
}

impl LabelError {
    /// Create a duplicate id error.
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create an unknown label type error.
    pub fn unknown_label_type(label_type: impl Into<String>) -> Self {
        Self::UnknownLabelType {
            label_type: label_type.into(),
        }
    }

    /// Create a malformed JSON error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJson {
            message: message.into(),
        }
    }

    /// Create a locked error.
    pub fn locked(locked_by: Option<&str>) -> Self {
        Self::LabelsLocked {
            locked_by: locked_by.map(str::to_string),
        }
    }

    /// True for errors the caller is expected to retry later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LabelsLocked { .. })
    }
}

/// A reported edit time was rejected as implausible.
///
/// This never aborts an update; it is reported alongside the applied update.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Rejected elapsed time {reported:.1}s: previous {previous:.1}s, at most {permitted_increase:.1}s more allowed"
)]
pub struct StaleTimeElapsed {
    /// Value sent by the client
    pub reported: f64,
    /// Value kept in the lock state
    pub previous: f64,
    /// Largest increase that would have been accepted
    pub permitted_increase: f64,
}

/// Result type for label operations.
pub type Result<T> = std::result::Result<T, LabelError>;
