use chrono::{DateTime, Utc};
use neo4rs::query;
use uuid::Uuid;

use facegraph_common::{
    ClusterFace, ClusterStats, ClusterView, FaceEmbedding, FaceGraphError, FaceScope, KnownPerson,
};

use crate::{store_err, GraphClient};

/// Read-side adapter for the graph. Supplies embeddings to the matcher and
/// clusterer and projects clusters into typed views.
///
/// Reads tolerate concurrent mutation: a cluster mid-merge is observed as
/// either pre- or post-merge state, never partially merged.
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// All known Person identities that carry a representative embedding.
    pub async fn person_embeddings(&self) -> Result<Vec<KnownPerson>, FaceGraphError> {
        let q = query(
            "MATCH (p:Person)
             WHERE p.embedding IS NOT NULL
             RETURN p.id AS id, p.name AS name, p.embedding AS embedding",
        );

        let mut known = Vec::new();
        let mut stream = self.client.execute(q).await?;
        while let Some(row) = stream.next().await.map_err(store_err)? {
            let id_str: String = row.get("id").unwrap_or_default();
            let name: String = row.get("name").unwrap_or_default();
            let embedding: Vec<f64> = row.get("embedding").unwrap_or_default();
            if let Ok(id) = Uuid::parse_str(&id_str) {
                if !embedding.is_empty() {
                    known.push(KnownPerson {
                        id,
                        name,
                        embedding,
                    });
                }
            }
        }

        Ok(known)
    }

    /// Face embeddings in the given scope: every face, or only faces not yet
    /// linked to a Person.
    pub async fn face_embeddings(
        &self,
        scope: FaceScope,
    ) -> Result<Vec<FaceEmbedding>, FaceGraphError> {
        let cypher = match scope {
            FaceScope::All => {
                "MATCH (f:Face)
                 WHERE f.embedding IS NOT NULL
                 RETURN f.id AS id, f.embedding AS embedding"
            }
            FaceScope::Unassigned => {
                "MATCH (f:Face)
                 WHERE f.embedding IS NOT NULL
                 AND NOT (f)-[:BELONGS_TO]->(:Person)
                 RETURN f.id AS id, f.embedding AS embedding"
            }
        };

        let mut faces = Vec::new();
        let mut stream = self.client.execute(query(cypher)).await?;
        while let Some(row) = stream.next().await.map_err(store_err)? {
            let id_str: String = row.get("id").unwrap_or_default();
            let embedding: Vec<f64> = row.get("embedding").unwrap_or_default();
            if let Ok(id) = Uuid::parse_str(&id_str) {
                if !embedding.is_empty() {
                    faces.push(FaceEmbedding { id, embedding });
                }
            }
        }

        Ok(faces)
    }

    /// A single cluster with its member faces, or None if it does not exist.
    pub async fn cluster(&self, cluster_id: Uuid) -> Result<Option<ClusterView>, FaceGraphError> {
        let q = query(
            "MATCH (c:FaceCluster {id: $id})
             OPTIONAL MATCH (f:Face)-[:IN_CLUSTER]->(c)
             WITH c, count(f) AS face_count
             RETURN c.id AS id, c.label AS label,
                    toString(c.created_at) AS created_at, face_count",
        )
        .param("id", cluster_id.to_string());

        let mut stream = self.client.execute(q).await?;
        let row = match stream.next().await.map_err(store_err)? {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut view = row_to_cluster_view(&row);
        view.faces = self.cluster_faces(cluster_id).await?;
        Ok(Some(view))
    }

    /// Clusters ordered by descending face count, paginated.
    pub async fn clusters(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ClusterView>, FaceGraphError> {
        let q = query(
            "MATCH (c:FaceCluster)
             OPTIONAL MATCH (f:Face)-[:IN_CLUSTER]->(c)
             WITH c, count(f) AS face_count
             ORDER BY face_count DESC
             SKIP $skip LIMIT $limit
             RETURN c.id AS id, c.label AS label,
                    toString(c.created_at) AS created_at, face_count",
        )
        .param("skip", skip as i64)
        .param("limit", limit as i64);

        let mut views = Vec::new();
        let mut stream = self.client.execute(q).await?;
        while let Some(row) = stream.next().await.map_err(store_err)? {
            views.push(row_to_cluster_view(&row));
        }

        for view in &mut views {
            view.faces = self.cluster_faces(view.id).await?;
        }

        Ok(views)
    }

    /// Member faces of one cluster, with their post back-reference.
    async fn cluster_faces(&self, cluster_id: Uuid) -> Result<Vec<ClusterFace>, FaceGraphError> {
        let q = query(
            "MATCH (f:Face)-[:IN_CLUSTER]->(c:FaceCluster {id: $id})
             OPTIONAL MATCH (f)-[:APPEARS_IN]->(p:Post)
             RETURN f.id AS id, f.crop_path AS crop_path, p.id AS post_id",
        )
        .param("id", cluster_id.to_string());

        let mut faces = Vec::new();
        let mut stream = self.client.execute(q).await?;
        while let Some(row) = stream.next().await.map_err(store_err)? {
            let id_str: String = row.get("id").unwrap_or_default();
            let crop_path: Option<String> = row.get("crop_path").ok();
            let post_id: Option<Uuid> = row
                .get::<String>("post_id")
                .ok()
                .and_then(|s| Uuid::parse_str(&s).ok());
            if let Ok(id) = Uuid::parse_str(&id_str) {
                faces.push(ClusterFace {
                    id,
                    crop_path,
                    post_id,
                });
            }
        }

        Ok(faces)
    }

    /// Counts describing the current clustering state.
    pub async fn cluster_stats(&self) -> Result<ClusterStats, FaceGraphError> {
        Ok(ClusterStats {
            total_clusters: self
                .count("MATCH (c:FaceCluster) RETURN count(c) AS count")
                .await?,
            clustered_faces: self
                .count("MATCH (f:Face)-[:IN_CLUSTER]->(:FaceCluster) RETURN count(f) AS count")
                .await?,
            unclustered_faces: self
                .count(
                    "MATCH (f:Face) WHERE NOT (f)-[:IN_CLUSTER]->(:FaceCluster)
                     RETURN count(f) AS count",
                )
                .await?,
            assigned_to_person: self
                .count("MATCH (f:Face)-[:BELONGS_TO]->(:Person) RETURN count(f) AS count")
                .await?,
        })
    }

    async fn count(&self, cypher: &str) -> Result<u64, FaceGraphError> {
        let mut stream = self.client.execute(query(cypher)).await?;
        if let Some(row) = stream.next().await.map_err(store_err)? {
            let count: i64 = row.get("count").unwrap_or(0);
            return Ok(count as u64);
        }
        Ok(0)
    }
}

fn row_to_cluster_view(row: &neo4rs::Row) -> ClusterView {
    let id_str: String = row.get("id").unwrap_or_default();
    let label: Option<String> = row.get("label").ok();
    let face_count: i64 = row.get("face_count").unwrap_or(0);
    let created_at: Option<DateTime<Utc>> = row
        .get::<String>("created_at")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    ClusterView {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        label,
        face_count: face_count as u32,
        created_at,
        faces: Vec::new(),
    }
}
