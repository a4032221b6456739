pub mod client;
pub mod cluster;
pub mod dbscan;
pub mod lifecycle;
pub mod matcher;
pub mod migrate;
pub mod pipeline;
pub mod reader;
pub mod similarity;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use cluster::Clusterer;
pub use lifecycle::ClusterLifecycle;
pub use matcher::IdentityMatcher;
pub use pipeline::FacePipeline;
pub use reader::GraphReader;
pub use writer::GraphWriter;

// Re-exported so integration tests can issue raw Cypher for setup.
pub use neo4rs::query;

use facegraph_common::FaceGraphError;

/// Map a driver error to the retryable store-failure kind at the crate
/// boundary. Validation failures are raised explicitly before any write, so
/// anything surfacing from the driver itself is a transport problem.
pub(crate) fn store_err(e: neo4rs::Error) -> FaceGraphError {
    FaceGraphError::StoreUnavailable(e.to_string())
}
