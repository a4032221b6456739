//! Batch cluster engine: groups unassigned faces into provisional clusters.
//!
//! A run is idempotent up to relabeling: it clears any pre-existing cluster
//! membership for exactly the faces in the batch (sweeping emptied clusters)
//! before creating new groups, so re-running with the same parameters on the
//! same embeddings yields an equivalent partition. A run that fails on the
//! store is safe to retry from scratch for the same reason.

use tracing::info;
use uuid::Uuid;

use facegraph_common::{ClusterRunSummary, CreatedCluster, FaceGraphError, FaceScope};

use crate::dbscan::dbscan;
use crate::reader::GraphReader;
use crate::similarity::l2_normalize;
use crate::writer::GraphWriter;
use crate::GraphClient;

/// Runs DBSCAN over face embeddings and materializes the resulting groups as
/// FaceCluster nodes.
pub struct Clusterer {
    reader: GraphReader,
    writer: GraphWriter,
    eps: f64,
    min_samples: usize,
}

impl Clusterer {
    pub fn new(client: GraphClient, eps: f64, min_samples: usize) -> Self {
        Self {
            reader: GraphReader::new(client.clone()),
            writer: GraphWriter::new(client),
            eps,
            min_samples,
        }
    }

    /// Run one clustering batch. `eps` and `min_samples` override the
    /// configured defaults when given; out-of-range values degrade to zero or
    /// one giant cluster rather than failing.
    pub async fn run(
        &self,
        eps: Option<f64>,
        min_samples: Option<usize>,
        scope: FaceScope,
    ) -> Result<ClusterRunSummary, FaceGraphError> {
        let eps = eps.unwrap_or(self.eps);
        let min_samples = min_samples.unwrap_or(self.min_samples);

        let faces = self.reader.face_embeddings(scope).await?;
        if faces.is_empty() {
            return Ok(ClusterRunSummary {
                eps_used: eps,
                min_samples_used: min_samples,
                ..ClusterRunSummary::default()
            });
        }

        info!(
            faces = faces.len(),
            eps, min_samples, "Clustering face embeddings"
        );

        let points: Vec<Vec<f64>> = faces.iter().map(|f| l2_normalize(&f.embedding)).collect();
        let labels = dbscan(&points, eps, min_samples);

        let face_ids: Vec<Uuid> = faces.iter().map(|f| f.id).collect();
        let groups = partition(&face_ids, &labels);
        let noise_faces = labels.iter().filter(|&&l| l < 0).count();

        info!(
            clusters = groups.len(),
            noise = noise_faces,
            "DBSCAN finished"
        );

        // Clear memberships for exactly this batch before creating new groups.
        self.writer.clear_face_clusters(&face_ids).await?;

        let mut clusters = Vec::with_capacity(groups.len());
        for members in &groups {
            let cluster_id = Uuid::new_v4();
            self.writer.create_cluster(cluster_id, members).await?;
            clusters.push(CreatedCluster {
                cluster_id,
                face_count: members.len() as u32,
                face_ids: members.clone(),
            });
        }

        Ok(ClusterRunSummary {
            total_faces: faces.len() as u32,
            clusters_created: clusters.len() as u32,
            noise_faces: noise_faces as u32,
            eps_used: eps,
            min_samples_used: min_samples,
            clusters,
        })
    }
}

/// Group face ids by positive DBSCAN label, dropping noise. Groups come out
/// in label order so repeat runs list them deterministically.
fn partition(face_ids: &[Uuid], labels: &[i32]) -> Vec<Vec<Uuid>> {
    let max_label = labels.iter().copied().max().unwrap_or(0);
    if max_label <= 0 {
        return Vec::new();
    }

    let mut groups: Vec<Vec<Uuid>> = vec![Vec::new(); max_label as usize];
    for (id, &label) in face_ids.iter().zip(labels.iter()) {
        if label > 0 {
            groups[(label - 1) as usize].push(*id);
        }
    }
    groups.retain(|g| !g.is_empty());
    groups
}
