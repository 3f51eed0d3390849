//! Error type shared by every store operation.

use thiserror::Error;

/// Result type alias using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure taxonomy of the region store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Dataset, version or layer name is unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// Name or file already exists; refused before any mutation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unparseable BED/VCF/layer/session content
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Disk failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Explicit decline at a confirmation checkpoint
    #[error("Aborted by user: {0}")]
    UserAborted(String),

    /// Catalog or manifest (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive packaging
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Session descriptor read/write
    #[error("Session error: {0}")]
    Session(String),
}

impl StoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        StoreError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        StoreError::Conflict(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        StoreError::MalformedInput(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        StoreError::Session(msg.into())
    }

    /// Whether the failure was caused by an explicit user decline.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, StoreError::UserAborted(_))
    }
}

impl From<quick_xml::Error> for StoreError {
    fn from(err: quick_xml::Error) -> Self {
        StoreError::Session(err.to_string())
    }
}
