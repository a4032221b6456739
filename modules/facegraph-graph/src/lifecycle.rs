//! Cluster lifecycle: label, merge, promote, delete.
//!
//! A face's grouping status moves `Unclustered → Clustered → Identified`.
//! Promotion is terminal for this subsystem: once a face BELONGS_TO a Person
//! it is skipped by unassigned-scope clustering runs. Cluster deletion and
//! re-clustering move faces back to Unclustered; merge moves them between
//! clusters. Each mutation here is one Cypher statement, atomic at the store.

use chrono::Utc;
use neo4rs::query;
use tracing::info;
use uuid::Uuid;

use facegraph_common::{ClusterStats, ClusterView, FaceGraphError, PersonRecord};

use crate::reader::GraphReader;
use crate::writer::format_datetime;
use crate::{store_err, GraphClient};

/// Lifecycle operations on provisional face clusters.
pub struct ClusterLifecycle {
    client: GraphClient,
    reader: GraphReader,
}

impl ClusterLifecycle {
    pub fn new(client: GraphClient) -> Self {
        Self {
            reader: GraphReader::new(client.clone()),
            client,
        }
    }

    /// Read one cluster with its member faces.
    pub async fn get(&self, cluster_id: Uuid) -> Result<Option<ClusterView>, FaceGraphError> {
        self.reader.cluster(cluster_id).await
    }

    /// List clusters ordered by descending face count.
    pub async fn list(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ClusterView>, FaceGraphError> {
        self.reader.clusters(skip, limit).await
    }

    /// Counts describing the current clustering state.
    pub async fn stats(&self) -> Result<ClusterStats, FaceGraphError> {
        self.reader.cluster_stats().await
    }

    /// Set a human label on a cluster for manual identification.
    pub async fn label(
        &self,
        cluster_id: Uuid,
        text: &str,
    ) -> Result<ClusterView, FaceGraphError> {
        let q = query(
            "MATCH (c:FaceCluster {id: $id})
             SET c.label = $label, c.updated_at = datetime($now)
             RETURN c.id AS id",
        )
        .param("id", cluster_id.to_string())
        .param("label", text)
        .param("now", format_datetime(&Utc::now()));

        let mut stream = self.client.execute(q).await?;
        if stream.next().await.map_err(store_err)?.is_none() {
            return Err(FaceGraphError::NotFound(format!("cluster {cluster_id}")));
        }

        self.reader
            .cluster(cluster_id)
            .await?
            .ok_or_else(|| FaceGraphError::NotFound(format!("cluster {cluster_id}")))
    }

    /// Promote a cluster into a durable, named Person.
    ///
    /// The Person's representative embedding is the component-wise mean of the
    /// member faces' raw embeddings — deliberately not normalized, matching
    /// how these embeddings were produced historically. The mean is computed
    /// inside the same statement that creates the Person, links every member,
    /// and deletes the cluster, so the membership it averages is the
    /// membership it links and partial application is never observable. A
    /// missing cluster and a memberless one are equally unpromotable.
    pub async fn promote_to_person(
        &self,
        cluster_id: Uuid,
        name: &str,
        notes: Option<&str>,
    ) -> Result<PersonRecord, FaceGraphError> {
        let person_id = Uuid::new_v4();
        let q = query(
            "MATCH (c:FaceCluster {id: $cluster_id})
             MATCH (f:Face)-[:IN_CLUSTER]->(c)
             WHERE f.embedding IS NOT NULL
             WITH c, collect(f) AS members, collect(f.embedding) AS embeddings
             WITH c, members,
                  [i IN range(0, size(embeddings[0]) - 1) |
                      reduce(acc = 0.0, e IN embeddings | acc + e[i])
                          / size(embeddings)] AS mean
             CREATE (p:Person {
                 id: $person_id,
                 name: $name,
                 notes: $notes,
                 embedding: mean,
                 created_at: datetime($now)
             })
             WITH c, p, members
             UNWIND members AS f
             MERGE (f)-[:BELONGS_TO]->(p)
             WITH c, p, count(f) AS face_count
             DETACH DELETE c
             RETURN p.embedding AS embedding, face_count",
        )
        .param("cluster_id", cluster_id.to_string())
        .param("person_id", person_id.to_string())
        .param("name", name)
        .param("notes", notes.map(str::to_string))
        .param("now", format_datetime(&Utc::now()));

        let mut stream = self.client.execute(q).await?;
        let row = stream
            .next()
            .await
            .map_err(store_err)?
            .ok_or_else(|| FaceGraphError::NotFound(format!("cluster {cluster_id}")))?;

        let embedding: Option<Vec<f64>> = row.get("embedding").ok();
        let face_count: i64 = row.get("face_count").unwrap_or(0);
        info!(person_id = %person_id, name, face_count, "Cluster promoted to person");

        Ok(PersonRecord {
            id: person_id,
            name: name.to_string(),
            notes: notes.map(str::to_string),
            embedding,
            face_count: face_count as u32,
        })
    }

    /// Merge clusters into the first-listed one.
    ///
    /// Faces from every other listed cluster are relinked to the target
    /// without duplicates, the sources are deleted — including sources that
    /// have been drained of members since they were created — face_count is
    /// recomputed from scratch, and the label changes only when `new_label`
    /// is given.
    pub async fn merge(
        &self,
        cluster_ids: &[Uuid],
        new_label: Option<&str>,
    ) -> Result<ClusterView, FaceGraphError> {
        if cluster_ids.len() < 2 {
            return Err(FaceGraphError::InvalidArgument(
                "merge requires at least two cluster ids".to_string(),
            ));
        }

        self.require_all_exist(cluster_ids).await?;

        let target_id = cluster_ids[0];
        let source_ids: Vec<String> = cluster_ids[1..].iter().map(Uuid::to_string).collect();

        let q = query(
            "MATCH (target:FaceCluster {id: $target_id})
             UNWIND $source_ids AS source_id
             MATCH (source:FaceCluster {id: source_id})
             OPTIONAL MATCH (f:Face)-[r:IN_CLUSTER]->(source)
             DELETE r
             WITH target, source, collect(f) AS moved
             FOREACH (m IN moved | MERGE (m)-[:IN_CLUSTER]->(target))
             DETACH DELETE source
             WITH DISTINCT target
             SET target.updated_at = datetime($now)
             SET target.label = CASE WHEN $label IS NULL THEN target.label ELSE $label END
             WITH target
             OPTIONAL MATCH (f:Face)-[:IN_CLUSTER]->(target)
             WITH target, count(f) AS fc
             SET target.face_count = fc
             RETURN target.id AS id",
        )
        .param("target_id", target_id.to_string())
        .param("source_ids", source_ids)
        .param("label", new_label.map(str::to_string))
        .param("now", format_datetime(&Utc::now()));

        self.client.run(q).await?;
        info!(target = %target_id, merged = cluster_ids.len() - 1, "Clusters merged");

        self.reader
            .cluster(target_id)
            .await?
            .ok_or_else(|| FaceGraphError::NotFound(format!("cluster {target_id}")))
    }

    /// Delete a cluster. Member faces revert to unclustered; they are not
    /// deleted.
    pub async fn delete(&self, cluster_id: Uuid) -> Result<(), FaceGraphError> {
        let q = query(
            "MATCH (c:FaceCluster {id: $id})
             DETACH DELETE c
             RETURN count(c) AS deleted",
        )
        .param("id", cluster_id.to_string());

        let mut stream = self.client.execute(q).await?;
        let deleted: i64 = match stream.next().await.map_err(store_err)? {
            Some(row) => row.get("deleted").unwrap_or(0),
            None => 0,
        };
        if deleted == 0 {
            return Err(FaceGraphError::NotFound(format!("cluster {cluster_id}")));
        }
        info!(cluster_id = %cluster_id, "Cluster deleted");
        Ok(())
    }

    async fn require_all_exist(&self, cluster_ids: &[Uuid]) -> Result<(), FaceGraphError> {
        let ids: Vec<String> = cluster_ids.iter().map(Uuid::to_string).collect();
        let q = query(
            "MATCH (c:FaceCluster)
             WHERE c.id IN $ids
             RETURN count(c) AS count",
        )
        .param("ids", ids);

        let mut stream = self.client.execute(q).await?;
        let found: i64 = match stream.next().await.map_err(store_err)? {
            Some(row) => row.get("count").unwrap_or(0),
            None => 0,
        };
        if found as usize != cluster_ids.len() {
            return Err(FaceGraphError::NotFound(format!(
                "{} of {} clusters missing",
                cluster_ids.len() - found as usize,
                cluster_ids.len()
            )));
        }
        Ok(())
    }
}
