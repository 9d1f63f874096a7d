/// Convenience result type used across the sizing pipeline.
pub type SizingResult<T> = Result<T, SizingError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum SizingError {
    /// Structurally required data is absent or malformed; the data set is aborted.
    #[error("unprocessable data: {0}")]
    Unprocessable(String),

    /// The run was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("sizing interrupted")]
    Interrupted,

    /// Invalid user-provided configuration or model data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Filesystem errors while reading inputs or writing outputs.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SizingError {
    /// Build a [`SizingError::Unprocessable`] value.
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::Unprocessable(msg.into())
    }

    /// Build a [`SizingError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SizingError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for user-requested cancellation, which callers treat as a silent abort.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<serde_json::Error> for SizingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
