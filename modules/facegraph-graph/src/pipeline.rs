//! Face pipeline — orchestrates detection, identity matching, and graph
//! writes for one image.
//!
//! The pipeline sequences three steps per detected face:
//! 1. **Persist**: create the Face node attached to its Post
//! 2. **Identify**: match the embedding against known Persons
//! 3. **Link**: on a match, attach the face to the Person and the Person to
//!    the Post (both idempotent)
//!
//! The detector is an optional collaborator: running without one is an
//! expected deployment configuration, and the pipeline then reports empty
//! results rather than failing.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use facegraph_common::{FaceDetector, FaceGraphError, FaceOutcome, MatchResult, NewFace};

use crate::matcher::IdentityMatcher;
use crate::writer::GraphWriter;
use crate::GraphClient;

/// Per-post face processing: detect, persist, identify, link.
pub struct FacePipeline {
    matcher: IdentityMatcher,
    writer: GraphWriter,
    detector: Option<Arc<dyn FaceDetector>>,
}

impl FacePipeline {
    pub fn new(
        client: GraphClient,
        tolerance: f64,
        detector: Option<Arc<dyn FaceDetector>>,
    ) -> Self {
        Self {
            matcher: IdentityMatcher::new(client.clone(), tolerance),
            writer: GraphWriter::new(client),
            detector,
        }
    }

    /// Process one image belonging to a post: detect faces, persist each as a
    /// Face node, and resolve identities against the known Persons.
    ///
    /// `crop_base` is an opaque prefix for member crop references; the crop
    /// itself is the media store's concern, not this pipeline's.
    pub async fn process_image(
        &self,
        post_id: Uuid,
        image: &[u8],
        crop_base: Option<&str>,
    ) -> Result<Vec<FaceOutcome>, FaceGraphError> {
        let detector = match &self.detector {
            Some(d) => d,
            None => {
                warn!("No face detector configured - skipping face detection");
                return Ok(Vec::new());
            }
        };

        let detections = detector.detect(image).await.map_err(|e| {
            warn!(error = %e, "Face detection failed");
            FaceGraphError::DetectorUnavailable
        })?;

        info!(post_id = %post_id, faces = detections.len(), "Faces detected");

        let mut outcomes = Vec::with_capacity(detections.len());
        for detection in detections {
            let face_id = Uuid::new_v4();
            let face = NewFace {
                id: face_id,
                embedding: detection.embedding.clone(),
                bounding_box: detection.bounding_box,
                crop_path: crop_base.map(|base| format!("{base}/{face_id}.jpg")),
            };
            self.writer.create_face(&face, post_id).await?;

            let result = self.matcher.identify_face(&detection.embedding).await?;
            if let MatchResult::Matched { person_id, .. } = &result {
                self.writer.link_face_to_person(face_id, *person_id).await?;
                self.writer.link_person_to_post(*person_id, post_id).await?;
            }

            outcomes.push(FaceOutcome {
                face_id,
                bounding_box: detection.bounding_box,
                result,
            });
        }

        Ok(outcomes)
    }

    /// Drop all Face nodes for a post ahead of reprocessing. Returns the
    /// number of faces removed.
    pub async fn reset_post(&self, post_id: Uuid) -> Result<u64, FaceGraphError> {
        self.writer.delete_faces_for_post(post_id).await
    }
}
