use config::{Config, ConfigError, Environment};
use dispatch_worker::DispatchWorkerConfig;
use serde::{Deserialize, Serialize};
use spanfan_postgres::PostgresConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // PostgreSQL configuration
    /// PostgreSQL host
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// PostgreSQL port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// PostgreSQL database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// PostgreSQL username
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    /// PostgreSQL password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Pool capacity, also the dispatch concurrency ceiling
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Warm pool floor opened at startup
    #[serde(default = "default_min_connections")]
    pub min_connections: usize,

    /// Uniform per-query timeout in seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    // Dispatch configuration
    /// Periods per disjunctive batch query
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Use the batched-disjunctive strategy instead of per-unit queries
    #[serde(default = "default_use_batching")]
    pub use_batching: bool,

    /// Optional sensor filter for the period source
    #[serde(default)]
    pub sensor_id: Option<i64>,

    /// Optional cap on the number of periods loaded
    #[serde(default)]
    pub period_limit: Option<i64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "benchmark".to_string()
}

fn default_postgres_username() -> String {
    "postgres".to_string()
}

fn default_postgres_password() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_min_connections() -> usize {
    2
}

fn default_command_timeout_secs() -> u64 {
    60
}

// Dispatch defaults
fn default_batch_size() -> usize {
    1000
}

fn default_use_batching() -> bool {
    false
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SPANFAN"))
            .build()?
            .try_deserialize()
    }

    pub fn postgres(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            command_timeout_secs: self.command_timeout_secs,
        }
    }

    pub fn dispatch(&self) -> DispatchWorkerConfig {
        DispatchWorkerConfig {
            batch_size: self.batch_size,
            use_batching: self.use_batching,
            max_in_flight: self.max_connections,
            sensor_id: self.sensor_id,
            period_limit: self.period_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("SPANFAN_MAX_CONNECTIONS");
        std::env::remove_var("SPANFAN_USE_BATCHING");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.batch_size, 1000);
        assert!(!config.use_batching);
        assert!(config.sensor_id.is_none());
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("SPANFAN_MAX_CONNECTIONS", "4");
        std::env::set_var("SPANFAN_USE_BATCHING", "true");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.max_connections, 4);
        assert!(config.use_batching);

        // Concurrency ceiling follows pool capacity.
        assert_eq!(config.dispatch().max_in_flight, 4);

        // Clean up
        std::env::remove_var("SPANFAN_MAX_CONNECTIONS");
        std::env::remove_var("SPANFAN_USE_BATCHING");
    }
}
