use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Detection geometry ---

/// Pixel bounding box of a detected face, in the detector's (top, right,
/// bottom, left) convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

// --- Embedding carriers ---

/// A known identity with its representative embedding, as read from the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownPerson {
    pub id: Uuid,
    pub name: String,
    pub embedding: Vec<f64>,
}

/// A face id paired with its embedding, as read from the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEmbedding {
    pub id: Uuid,
    pub embedding: Vec<f64>,
}

/// Which faces a clustering run considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceScope {
    /// Every face with an embedding.
    All,
    /// Only faces not yet linked to a Person.
    Unassigned,
}

// --- Matching ---

/// Outcome of matching one embedding against the known identities.
///
/// `confidence` is `1 - distance` under the normalized-Euclidean regime; it
/// is only meaningful relative to the tolerance it was computed with, and is
/// not a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        person_id: Uuid,
        name: String,
        confidence: f64,
    },
    New,
}

impl MatchResult {
    pub fn is_new(&self) -> bool {
        matches!(self, MatchResult::New)
    }
}

/// A known Person within a similarity threshold of a query embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarPerson {
    pub person_id: Uuid,
    pub name: String,
    pub similarity: f64,
}

// --- Cluster views ---

/// A member face as projected into cluster views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterFace {
    pub id: Uuid,
    pub crop_path: Option<String>,
    pub post_id: Option<Uuid>,
}

/// Read-only projection of a FaceCluster with its members.
/// `face_count` is always recomputed from the IN_CLUSTER edges, never read
/// from the cached node property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterView {
    pub id: Uuid,
    pub label: Option<String>,
    pub face_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub faces: Vec<ClusterFace>,
}

/// One cluster created by a batch clustering run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedCluster {
    pub cluster_id: Uuid,
    pub face_count: u32,
    pub face_ids: Vec<Uuid>,
}

/// Summary returned by a batch clustering run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterRunSummary {
    pub total_faces: u32,
    pub clusters_created: u32,
    pub noise_faces: u32,
    pub eps_used: f64,
    pub min_samples_used: usize,
    pub clusters: Vec<CreatedCluster>,
}

impl std::fmt::Display for ClusterRunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Clustering Complete ===")?;
        writeln!(f, "Faces considered: {}", self.total_faces)?;
        writeln!(f, "Clusters created: {}", self.clusters_created)?;
        writeln!(f, "Noise faces:      {}", self.noise_faces)?;
        writeln!(
            f,
            "Parameters:       eps={} min_samples={}",
            self.eps_used, self.min_samples_used
        )?;
        Ok(())
    }
}

/// Counts describing the current clustering state of the graph.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_clusters: u64,
    pub clustered_faces: u64,
    pub unclustered_faces: u64,
    pub assigned_to_person: u64,
}

// --- Persons and faces ---

/// A resolved identity as returned by promotion or person creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub embedding: Option<Vec<f64>>,
    pub face_count: u32,
}

/// A face to persist: one detection result, identity-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFace {
    pub id: Uuid,
    pub embedding: Vec<f64>,
    pub bounding_box: BoundingBox,
    pub crop_path: Option<String>,
}

/// Per-face result of running the pipeline over one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceOutcome {
    pub face_id: Uuid,
    pub bounding_box: BoundingBox,
    pub result: MatchResult,
}
