use chrono::{DateTime, Utc};
use neo4rs::query;
use tracing::info;
use uuid::Uuid;

use facegraph_common::{FaceGraphError, NewFace, PersonRecord};

use crate::{store_err, GraphClient};

/// Write-side adapter for the graph. Every method issues a single Cypher
/// statement so each mutation is atomic at the store; the store is the only
/// lock domain.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Persist one detection as a Face node attached to its Post.
    /// Fails with `NotFound` if the post does not exist.
    pub async fn create_face(&self, face: &NewFace, post_id: Uuid) -> Result<(), FaceGraphError> {
        let q = query(
            "MATCH (p:Post {id: $post_id})
             CREATE (f:Face {
                 id: $id,
                 embedding: $embedding,
                 box_top: $box_top,
                 box_right: $box_right,
                 box_bottom: $box_bottom,
                 box_left: $box_left,
                 crop_path: $crop_path,
                 created_at: datetime($created_at)
             })
             CREATE (f)-[:APPEARS_IN]->(p)
             RETURN f.id AS id",
        )
        .param("post_id", post_id.to_string())
        .param("id", face.id.to_string())
        .param("embedding", face.embedding.clone())
        .param("box_top", face.bounding_box.top)
        .param("box_right", face.bounding_box.right)
        .param("box_bottom", face.bounding_box.bottom)
        .param("box_left", face.bounding_box.left)
        .param("crop_path", face.crop_path.clone())
        .param("created_at", format_datetime(&Utc::now()));

        let mut stream = self.client.execute(q).await?;
        if stream.next().await.map_err(store_err)?.is_none() {
            return Err(FaceGraphError::NotFound(format!("post {post_id}")));
        }
        Ok(())
    }

    /// Create a Person with an optional representative embedding.
    pub async fn create_person(
        &self,
        name: &str,
        notes: Option<&str>,
        embedding: Option<&[f64]>,
    ) -> Result<PersonRecord, FaceGraphError> {
        let id = Uuid::new_v4();
        let q = query(
            "CREATE (p:Person {
                 id: $id,
                 name: $name,
                 notes: $notes,
                 embedding: $embedding,
                 created_at: datetime($created_at)
             })
             RETURN p.id AS id",
        )
        .param("id", id.to_string())
        .param("name", name)
        .param("notes", notes.map(str::to_string))
        .param("embedding", embedding.map(|e| e.to_vec()))
        .param("created_at", format_datetime(&Utc::now()));

        self.client.run(q).await?;
        info!(person_id = %id, name, "Person created");

        Ok(PersonRecord {
            id,
            name: name.to_string(),
            notes: notes.map(str::to_string),
            embedding: embedding.map(|e| e.to_vec()),
            face_count: 0,
        })
    }

    /// Link a face to a person. Idempotent: MERGE never duplicates the edge.
    /// Fails with `NotFound` if either side is missing.
    pub async fn link_face_to_person(
        &self,
        face_id: Uuid,
        person_id: Uuid,
    ) -> Result<(), FaceGraphError> {
        let q = query(
            "MATCH (f:Face {id: $face_id})
             MATCH (p:Person {id: $person_id})
             MERGE (f)-[:BELONGS_TO]->(p)
             RETURN f.id AS id",
        )
        .param("face_id", face_id.to_string())
        .param("person_id", person_id.to_string());

        let mut stream = self.client.execute(q).await?;
        if stream.next().await.map_err(store_err)?.is_none() {
            return Err(FaceGraphError::NotFound(format!(
                "face {face_id} or person {person_id}"
            )));
        }
        Ok(())
    }

    /// Record that a person appears in a post. Idempotent; the edge keeps its
    /// original creation timestamp on repeat calls.
    pub async fn link_person_to_post(
        &self,
        person_id: Uuid,
        post_id: Uuid,
    ) -> Result<(), FaceGraphError> {
        let q = query(
            "MATCH (p:Person {id: $person_id})
             MATCH (post:Post {id: $post_id})
             MERGE (p)-[r:APPEARS_IN]->(post)
             ON CREATE SET r.created_at = datetime($created_at)
             RETURN p.id AS id",
        )
        .param("person_id", person_id.to_string())
        .param("post_id", post_id.to_string())
        .param("created_at", format_datetime(&Utc::now()));

        let mut stream = self.client.execute(q).await?;
        if stream.next().await.map_err(store_err)?.is_none() {
            return Err(FaceGraphError::NotFound(format!(
                "person {person_id} or post {post_id}"
            )));
        }
        Ok(())
    }

    /// Remove IN_CLUSTER edges for exactly the given faces and sweep away any
    /// cluster left without members. Required before every clustering run so
    /// repeat runs over the same faces are idempotent up to relabeling.
    pub async fn clear_face_clusters(&self, face_ids: &[Uuid]) -> Result<(), FaceGraphError> {
        if face_ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = face_ids.iter().map(Uuid::to_string).collect();
        let q = query(
            "MATCH (f:Face)-[r:IN_CLUSTER]->(c:FaceCluster)
             WHERE f.id IN $face_ids
             DELETE r
             WITH c
             WHERE NOT (c)<-[:IN_CLUSTER]-()
             DELETE c",
        )
        .param("face_ids", ids);

        self.client.run(q).await
    }

    /// Create a FaceCluster node and link every member face to it, as one
    /// atomic statement.
    pub async fn create_cluster(
        &self,
        cluster_id: Uuid,
        face_ids: &[Uuid],
    ) -> Result<(), FaceGraphError> {
        let ids: Vec<String> = face_ids.iter().map(Uuid::to_string).collect();
        let q = query(
            "CREATE (c:FaceCluster {
                 id: $cluster_id,
                 created_at: datetime($created_at),
                 face_count: $face_count
             })
             WITH c
             UNWIND $face_ids AS face_id
             MATCH (f:Face {id: face_id})
             MERGE (f)-[:IN_CLUSTER]->(c)",
        )
        .param("cluster_id", cluster_id.to_string())
        .param("created_at", format_datetime(&Utc::now()))
        .param("face_count", face_ids.len() as i64)
        .param("face_ids", ids);

        self.client.run(q).await
    }

    /// Delete all Face nodes attached to a post, for reprocessing. Faces are
    /// the only entities the detection pipeline owns; persons and clusters
    /// referencing them survive (clusters may end up smaller).
    pub async fn delete_faces_for_post(&self, post_id: Uuid) -> Result<u64, FaceGraphError> {
        let q = query(
            "MATCH (f:Face)-[:APPEARS_IN]->(p:Post {id: $post_id})
             DETACH DELETE f
             RETURN count(f) AS deleted",
        )
        .param("post_id", post_id.to_string());

        let mut stream = self.client.execute(q).await?;
        if let Some(row) = stream.next().await.map_err(store_err)? {
            let deleted: i64 = row.get("deleted").unwrap_or(0);
            info!(post_id = %post_id, deleted, "Faces deleted for reprocessing");
            return Ok(deleted as u64);
        }
        Ok(0)
    }
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
