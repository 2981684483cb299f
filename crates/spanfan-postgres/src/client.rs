use anyhow::Result;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

use crate::config::PostgresConfig;

/// PostgreSQL client wrapper with connection pooling
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Creates a new PostgreSQL client with connection pooling
    ///
    /// The pool is sized to `config.max_connections`; connections are opened
    /// lazily, so a bad DSN surfaces on first use, not here. Use [`ping`]
    /// to verify connectivity before dispatching.
    ///
    /// [`ping`]: PostgresClient::ping
    pub fn new(config: &PostgresConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.database.clone());
        cfg.user = Some(config.username.clone());
        cfg.password = Some(config.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
        pool.resize(config.max_connections);

        Ok(Self { pool })
    }

    /// Pings the database to verify connectivity
    pub async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("SELECT 1", &[]).await?;
        debug!("postgreSQL connection successful");
        Ok(())
    }

    /// Opens `min_connections` connections up front (warm pool floor).
    ///
    /// The clients are held simultaneously so the pool actually opens that
    /// many, then returned on drop.
    pub async fn warm(&self, min_connections: usize) -> Result<()> {
        let mut held = Vec::with_capacity(min_connections);
        for _ in 0..min_connections {
            held.push(self.pool.get().await?);
        }
        debug!(connections = held.len(), "warmed connection pool");
        Ok(())
    }

    /// Gets a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }
}
