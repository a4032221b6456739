use std::future::Future;
use std::time::Duration;

use neo4rs::{ConfigBuilder, DetachedRowStream, Graph, Query};
use tokio::time::timeout;

use facegraph_common::{Config, FaceGraphError};

use crate::store_err;

/// Rows fetched per round trip; face embedding rows are large (128 floats).
const DEFAULT_FETCH_SIZE: usize = 200;
const DEFAULT_MAX_CONNECTIONS: usize = 10;
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around neo4rs::Graph providing connection setup and bounded
/// query execution. Constructed once at process start and cloned into each
/// service.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
    query_timeout: Duration,
}

impl GraphClient {
    /// Connect to Neo4j with the given credentials and default tuning.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        Self::connect_tuned(
            uri,
            user,
            password,
            DEFAULT_FETCH_SIZE,
            DEFAULT_MAX_CONNECTIONS,
            DEFAULT_QUERY_TIMEOUT,
        )
        .await
    }

    /// Connect with every tunable taken from application configuration.
    pub async fn connect_with(config: &Config) -> Result<Self, neo4rs::Error> {
        Self::connect_tuned(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
            config.fetch_size,
            config.max_connections,
            config.store_timeout(),
        )
        .await
    }

    async fn connect_tuned(
        uri: &str,
        user: &str,
        password: &str,
        fetch_size: usize,
        max_connections: usize,
        query_timeout: Duration,
    ) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(fetch_size)
            .max_connections(max_connections)
            .build()
            .unwrap();
        let graph = Graph::connect(config).await?;
        Ok(Self {
            graph,
            query_timeout,
        })
    }

    /// Override the per-query deadline, e.g. for long-running batch work.
    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Execute a query with the configured deadline. A query that neither
    /// completes nor fails within the deadline surfaces as the retryable
    /// store-failure kind.
    pub(crate) async fn execute(&self, q: Query) -> Result<DetachedRowStream, FaceGraphError> {
        bounded(self.query_timeout, self.graph.execute(q)).await
    }

    /// Run a query with the configured deadline, discarding the result.
    pub(crate) async fn run(&self, q: Query) -> Result<(), FaceGraphError> {
        bounded(self.query_timeout, self.graph.run(q)).await
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, neo4rs::Error>>,
) -> Result<T, FaceGraphError> {
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(store_err),
        Err(_) => Err(FaceGraphError::StoreUnavailable(format!(
            "store operation exceeded {limit:?}"
        ))),
    }
}
