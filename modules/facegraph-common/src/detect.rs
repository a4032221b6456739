use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

/// One face found in an image: where it is and its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub embedding: Vec<f64>,
}

/// External face detection backend.
///
/// Implementations must return an empty list when no faces are found or when
/// detection fails internally — never partial or zero-vector embeddings. The
/// embedding dimensionality is fixed by the backend and must be consistent
/// across all detections it produces.
#[async_trait::async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>>;
}
