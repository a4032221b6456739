use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
/// Read-only after initialization; all tunables have sane defaults.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    /// Rows fetched from the store per round trip.
    pub fetch_size: usize,

    /// Upper bound on pooled Bolt connections.
    pub max_connections: usize,

    /// Deadline for any single store operation, in seconds. A call that
    /// exceeds it fails with the retryable store-failure kind.
    pub store_timeout_secs: u64,

    /// Maximum normalized distance at which a face matches a known Person.
    pub match_tolerance: f64,

    /// DBSCAN neighborhood radius over normalized embeddings.
    pub cluster_eps: f64,

    /// Minimum neighborhood size (including the point itself) to seed a cluster.
    pub cluster_min_samples: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            fetch_size: parsed_env("NEO4J_FETCH_SIZE", 200),
            max_connections: parsed_env("NEO4J_MAX_CONNECTIONS", 10),
            store_timeout_secs: parsed_env("STORE_TIMEOUT_SECS", 30),
            match_tolerance: parsed_env("MATCH_TOLERANCE", 0.6),
            cluster_eps: parsed_env("CLUSTER_EPS", 0.5),
            cluster_min_samples: parsed_env("CLUSTER_MIN_SAMPLES", 2),
        }
    }

    /// Store operation deadline as a `Duration`.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
