use serde::{Deserialize, Serialize};

/// PostgreSQL configuration
///
/// `max_connections` is both the pool capacity and the dispatch concurrency
/// ceiling; it is carried from here so the two bounds cannot drift apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: usize,
    /// Connections opened up front so the first dispatch wave does not pay
    /// connection setup latency.
    pub min_connections: usize,
    /// Uniform per-query timeout in seconds.
    pub command_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "benchmark".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            max_connections: 10,
            min_connections: 2,
            command_timeout_secs: 60,
        }
    }
}
