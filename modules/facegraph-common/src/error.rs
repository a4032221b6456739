use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceGraphError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Face detector unavailable")]
    DetectorUnavailable,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FaceGraphError {
    /// Whether a caller may retry the failed operation. Validation failures
    /// are permanent; only store transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FaceGraphError::StoreUnavailable(_))
    }
}
