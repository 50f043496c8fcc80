//! Database query functions for the `planning_pools` table.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::rows_per_statement;
use crate::models::PoolSummary;

/// A pool summary ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPool {
    pub id: Uuid,
    pub planning_id: Uuid,
    pub external_pool_id: String,
    pub name: String,
    pub teams: Vec<String>,
    pub team_count: i32,
    pub match_count: i32,
}

/// Bind parameters per inserted pool row.
const POOL_COLUMNS: usize = 7;

/// Insert all pools in one transaction, chunked like
/// [`insert_matches`](super::matches::insert_matches).
pub async fn insert_pools(pool: &PgPool, pools: &[NewPool]) -> Result<Vec<PoolSummary>> {
    if pools.is_empty() {
        return Ok(Vec::new());
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut inserted = Vec::with_capacity(pools.len());

    for chunk in pools.chunks(rows_per_statement(POOL_COLUMNS)) {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO planning_pools (id, planning_id, external_pool_id, name, teams, \
             team_count, match_count) ",
        );
        builder.push_values(chunk, |mut row, p| {
            row.push_bind(p.id)
                .push_bind(p.planning_id)
                .push_bind(p.external_pool_id.as_str())
                .push_bind(p.name.as_str())
                .push_bind(p.teams.as_slice())
                .push_bind(p.team_count)
                .push_bind(p.match_count);
        });
        builder.push(" RETURNING *");

        let rows = builder
            .build_query_as::<PoolSummary>()
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("failed to insert {} pools", chunk.len()))?;
        inserted.extend(rows);
    }

    tx.commit().await.context("failed to commit pools")?;
    Ok(inserted)
}

/// List the pools of a planning, ordered by their external ID.
pub async fn list_pools_for_planning(pool: &PgPool, planning_id: Uuid) -> Result<Vec<PoolSummary>> {
    let pools = sqlx::query_as::<_, PoolSummary>(
        "SELECT * FROM planning_pools WHERE planning_id = $1 ORDER BY external_pool_id ASC",
    )
    .bind(planning_id)
    .fetch_all(pool)
    .await
    .context("failed to list pools for planning")?;

    Ok(pools)
}

/// Delete every pool of a planning. Returns the number of rows deleted.
pub async fn delete_pools_for_planning(pool: &PgPool, planning_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM planning_pools WHERE planning_id = $1")
        .bind(planning_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete pools of planning {planning_id}"))?;

    Ok(result.rows_affected())
}
