use neo4rs::query;
use tracing::{info, warn};

use facegraph_common::FaceGraphError;

use crate::GraphClient;

/// Run idempotent schema migrations: uniqueness constraints and indexes.
/// Individual statement failures are logged and skipped so a partially
/// migrated database can always be brought forward.
pub async fn migrate(client: &GraphClient) -> Result<(), FaceGraphError> {
    info!("Running schema migrations...");

    let constraints = [
        "CREATE CONSTRAINT person_id IF NOT EXISTS FOR (p:Person) REQUIRE p.id IS UNIQUE",
        "CREATE CONSTRAINT post_id IF NOT EXISTS FOR (p:Post) REQUIRE p.id IS UNIQUE",
        "CREATE CONSTRAINT face_id IF NOT EXISTS FOR (f:Face) REQUIRE f.id IS UNIQUE",
        "CREATE CONSTRAINT cluster_id IF NOT EXISTS FOR (c:FaceCluster) REQUIRE c.id IS UNIQUE",
    ];

    for c in &constraints {
        if let Err(e) = client.run(query(c)).await {
            warn!(statement = c, error = %e, "Constraint statement failed, continuing");
        }
    }
    info!("Uniqueness constraints created");

    let indexes = [
        "CREATE INDEX person_name IF NOT EXISTS FOR (p:Person) ON (p.name)",
        "CREATE INDEX cluster_label IF NOT EXISTS FOR (c:FaceCluster) ON (c.label)",
    ];

    for idx in &indexes {
        if let Err(e) = client.run(query(idx)).await {
            warn!(statement = idx, error = %e, "Index statement failed, continuing");
        }
    }
    info!("Property indexes created");

    Ok(())
}
