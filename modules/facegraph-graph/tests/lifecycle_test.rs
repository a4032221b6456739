#![cfg(feature = "test-utils")]

// Cluster lifecycle integration tests: label, merge, promote, delete.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p facegraph-graph --features test-utils --test lifecycle_test

use std::collections::HashSet;

use uuid::Uuid;

use facegraph_common::{BoundingBox, FaceGraphError, NewFace};
use facegraph_graph::{query, ClusterLifecycle, GraphClient, GraphWriter};

async fn seed_post(client: &GraphClient) -> Uuid {
    let post_id = Uuid::new_v4();
    client
        .inner()
        .run(
            query("CREATE (p:Post {id: $id, shortcode: $shortcode})")
                .param("id", post_id.to_string())
                .param("shortcode", "test_post"),
        )
        .await
        .expect("create post");
    post_id
}

async fn seed_cluster(
    client: &GraphClient,
    writer: &GraphWriter,
    post_id: Uuid,
    embeddings: &[Vec<f64>],
) -> (Uuid, Vec<Uuid>) {
    let mut face_ids = Vec::new();
    for embedding in embeddings {
        let face = NewFace {
            id: Uuid::new_v4(),
            embedding: embedding.clone(),
            bounding_box: BoundingBox {
                top: 0,
                right: 10,
                bottom: 10,
                left: 0,
            },
            crop_path: None,
        };
        writer.create_face(&face, post_id).await.expect("create face");
        face_ids.push(face.id);
    }

    let cluster_id = Uuid::new_v4();
    writer
        .create_cluster(cluster_id, &face_ids)
        .await
        .expect("create cluster");

    // Sanity: the view reflects the seeded membership.
    let lifecycle = ClusterLifecycle::new(client.clone());
    let view = lifecycle
        .get(cluster_id)
        .await
        .expect("get cluster")
        .expect("cluster exists");
    assert_eq!(view.face_count as usize, embeddings.len());

    (cluster_id, face_ids)
}

async fn count(client: &GraphClient, cypher: &str) -> i64 {
    let mut stream = client.inner().execute(query(cypher)).await.expect("query");
    let row = stream.next().await.expect("stream").expect("row");
    row.get("count").expect("count column")
}

#[tokio::test]
async fn label_sets_text_and_missing_cluster_is_not_found() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;
    let (cluster_id, _) =
        seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0], vec![0.9, 0.1]]).await;

    let lifecycle = ClusterLifecycle::new(client.clone());
    let view = lifecycle
        .label(cluster_id, "maybe grandma")
        .await
        .expect("label");
    assert_eq!(view.label.as_deref(), Some("maybe grandma"));

    let err = lifecycle
        .label(Uuid::new_v4(), "nobody")
        .await
        .expect_err("labeling a missing cluster");
    assert!(matches!(err, FaceGraphError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn merge_combines_disjoint_clusters_into_first() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;

    let (c1, c1_faces) =
        seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0], vec![0.9, 0.1]]).await;
    let (c2, c2_faces) = seed_cluster(
        &client,
        &writer,
        post_id,
        &[vec![0.0, 1.0], vec![0.1, 0.9], vec![0.2, 0.8]],
    )
    .await;

    let lifecycle = ClusterLifecycle::new(client.clone());
    let merged = lifecycle
        .merge(&[c1, c2], Some("Smith family"))
        .await
        .expect("merge");

    assert_eq!(merged.id, c1);
    assert_eq!(merged.face_count, 5);
    assert_eq!(merged.label.as_deref(), Some("Smith family"));

    let member_ids: HashSet<Uuid> = merged.faces.iter().map(|f| f.id).collect();
    let expected: HashSet<Uuid> = c1_faces.iter().chain(c2_faces.iter()).copied().collect();
    assert_eq!(member_ids, expected);

    // Source cluster is gone; total count dropped by exactly one.
    assert!(lifecycle.get(c2).await.expect("get c2").is_none());
    assert_eq!(count(&client, "MATCH (c:FaceCluster) RETURN count(c) AS count").await, 1);
}

#[tokio::test]
async fn merge_without_new_label_preserves_existing() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;

    let (c1, _) = seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0]]).await;
    let (c2, _) = seed_cluster(&client, &writer, post_id, &[vec![0.0, 1.0]]).await;

    let lifecycle = ClusterLifecycle::new(client.clone());
    lifecycle.label(c1, "kept").await.expect("label");

    let merged = lifecycle.merge(&[c1, c2], None).await.expect("merge");
    assert_eq!(merged.label.as_deref(), Some("kept"));
}

#[tokio::test]
async fn merge_validates_arguments() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;
    let (c1, _) = seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0]]).await;

    let lifecycle = ClusterLifecycle::new(client.clone());

    let err = lifecycle.merge(&[c1], None).await.expect_err("one id");
    assert!(matches!(err, FaceGraphError::InvalidArgument(_)));

    let err = lifecycle
        .merge(&[c1, Uuid::new_v4()], None)
        .await
        .expect_err("missing id");
    assert!(matches!(err, FaceGraphError::NotFound(_)));

    // Failed merges leave the target untouched.
    let view = lifecycle.get(c1).await.expect("get").expect("exists");
    assert_eq!(view.face_count, 1);
}

#[tokio::test]
async fn merge_deletes_source_cluster_drained_of_faces() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_a = seed_post(&client).await;
    let post_b = seed_post(&client).await;

    let (target, target_faces) =
        seed_cluster(&client, &writer, post_a, &[vec![1.0, 0.0], vec![0.9, 0.1]]).await;
    let (source, _) = seed_cluster(&client, &writer, post_b, &[vec![0.0, 1.0]]).await;

    // Reprocessing post B drains the source cluster but leaves its node.
    writer.delete_faces_for_post(post_b).await.expect("delete faces");
    assert_eq!(count(&client, "MATCH (c:FaceCluster) RETURN count(c) AS count").await, 2);

    let lifecycle = ClusterLifecycle::new(client.clone());
    let merged = lifecycle
        .merge(&[target, source], Some("after cleanup"))
        .await
        .expect("merge");

    // The emptied source is still removed and the target still updated.
    assert_eq!(merged.face_count as usize, target_faces.len());
    assert_eq!(merged.label.as_deref(), Some("after cleanup"));
    assert!(lifecycle.get(source).await.expect("get source").is_none());
    assert_eq!(count(&client, "MATCH (c:FaceCluster) RETURN count(c) AS count").await, 1);
}

#[tokio::test]
async fn promote_creates_person_with_mean_embedding() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;

    let (cluster_id, face_ids) = seed_cluster(
        &client,
        &writer,
        post_id,
        &[
            vec![1.0, 0.0, 3.0],
            vec![2.0, 3.0, 0.0],
            vec![3.0, 0.0, 3.0],
        ],
    )
    .await;

    let lifecycle = ClusterLifecycle::new(client.clone());
    let person = lifecycle
        .promote_to_person(cluster_id, "Grandma June", Some("from the lake photos"))
        .await
        .expect("promote");

    assert_eq!(person.name, "Grandma June");
    assert_eq!(person.face_count, 3);
    // Mean of raw embeddings, component-wise, no normalization.
    assert_eq!(person.embedding.as_deref(), Some(&[2.0, 1.0, 2.0][..]));

    // The cluster no longer exists.
    assert!(lifecycle.get(cluster_id).await.expect("get").is_none());

    // All member faces now belong to the new person.
    let mut stream = client
        .inner()
        .execute(
            query(
                "MATCH (f:Face)-[:BELONGS_TO]->(p:Person {id: $id})
                 RETURN f.id AS id",
            )
            .param("id", person.id.to_string()),
        )
        .await
        .expect("query");
    let mut linked = HashSet::new();
    while let Some(row) = stream.next().await.expect("stream") {
        let id: String = row.get("id").expect("id");
        linked.insert(Uuid::parse_str(&id).expect("uuid"));
    }
    assert_eq!(linked, face_ids.into_iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn promote_missing_cluster_is_not_found() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;

    let lifecycle = ClusterLifecycle::new(client.clone());
    let err = lifecycle
        .promote_to_person(Uuid::new_v4(), "Nobody", None)
        .await
        .expect_err("promote missing");
    assert!(matches!(err, FaceGraphError::NotFound(_)));
}

#[tokio::test]
async fn promote_drained_cluster_fails_without_creating_a_person() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;

    let (cluster_id, _) =
        seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0], vec![0.9, 0.1]]).await;
    writer.delete_faces_for_post(post_id).await.expect("delete faces");

    let lifecycle = ClusterLifecycle::new(client.clone());
    let err = lifecycle
        .promote_to_person(cluster_id, "Nobody", None)
        .await
        .expect_err("promote drained cluster");
    assert!(matches!(err, FaceGraphError::NotFound(_)));

    // No half-applied promotion: no Person node, cluster untouched.
    assert_eq!(count(&client, "MATCH (p:Person) RETURN count(p) AS count").await, 0);
    assert!(lifecycle.get(cluster_id).await.expect("get").is_some());
}

#[tokio::test]
async fn delete_removes_cluster_but_keeps_faces() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;

    let (cluster_id, _) =
        seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0], vec![0.9, 0.1]]).await;

    let lifecycle = ClusterLifecycle::new(client.clone());
    lifecycle.delete(cluster_id).await.expect("delete");

    assert_eq!(count(&client, "MATCH (c:FaceCluster) RETURN count(c) AS count").await, 0);
    assert_eq!(count(&client, "MATCH (f:Face) RETURN count(f) AS count").await, 2);

    let err = lifecycle.delete(cluster_id).await.expect_err("double delete");
    assert!(matches!(err, FaceGraphError::NotFound(_)));
}

#[tokio::test]
async fn stats_reflect_clustered_and_assigned_faces() {
    let (_container, client) = facegraph_graph::testutil::neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let post_id = seed_post(&client).await;

    let (_cluster_id, face_ids) =
        seed_cluster(&client, &writer, post_id, &[vec![1.0, 0.0], vec![0.9, 0.1]]).await;

    // A third face, unclustered and assigned to a person.
    let loose = NewFace {
        id: Uuid::new_v4(),
        embedding: vec![0.0, 1.0],
        bounding_box: BoundingBox {
            top: 0,
            right: 10,
            bottom: 10,
            left: 0,
        },
        crop_path: None,
    };
    writer.create_face(&loose, post_id).await.expect("create face");
    let person = writer
        .create_person("Alice", None, Some(&[0.0, 1.0]))
        .await
        .expect("create person");
    writer
        .link_face_to_person(loose.id, person.id)
        .await
        .expect("link");

    let lifecycle = ClusterLifecycle::new(client.clone());
    let stats = lifecycle.stats().await.expect("stats");

    assert_eq!(stats.total_clusters, 1);
    assert_eq!(stats.clustered_faces, face_ids.len() as u64);
    assert_eq!(stats.unclustered_faces, 1);
    assert_eq!(stats.assigned_to_person, 1);
}
