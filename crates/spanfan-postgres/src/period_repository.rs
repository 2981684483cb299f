use anyhow::Context;
use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tracing::info;

use spanfan_domain::{DomainError, DomainResult, ListPeriodsInput, PeriodRepository, WorkUnit};

use crate::client::PostgresClient;
use crate::query::CLOSED_STATUS;

/// PostgreSQL implementation of PeriodRepository, reading closed periods
/// from the dimension table.
#[derive(Clone)]
pub struct PostgresPeriodRepository {
    client: PostgresClient,
}

impl PostgresPeriodRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PeriodRepository for PostgresPeriodRepository {
    async fn list_closed_periods(&self, input: ListPeriodsInput) -> DomainResult<Vec<WorkUnit>> {
        let mut sql = String::from(
            "SELECT id, sensor_id, start_time, end_time
             FROM bench.active_periods
             WHERE status = $1",
        );
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&CLOSED_STATUS];

        if let Some(ref sensor_id) = input.sensor_id {
            sql.push_str(&format!(" AND sensor_id = ${}", params.len() + 1));
            params.push(sensor_id);
        }
        sql.push_str(" ORDER BY id");
        if let Some(ref limit) = input.limit {
            sql.push_str(&format!(" LIMIT ${}", params.len() + 1));
            params.push(limit);
        }

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(sql.as_str(), &params)
            .await
            .context("Failed to query active periods")
            .map_err(DomainError::RepositoryError)?;

        let mut units = Vec::with_capacity(rows.len());
        for row in rows {
            units.push(WorkUnit::new(
                row.get(1),
                row.get(2),
                row.get(3),
                Some(row.get(0)),
            )?);
        }

        info!(period_count = units.len(), "loaded closed periods");
        Ok(units)
    }
}
