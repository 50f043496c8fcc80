//! Database query functions for the `planning_matches` table.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::rows_per_statement;
use crate::models::{MatchPhase, MatchStatus, ResolvedMatch};

/// A fully built match ready to be inserted. The ID is assigned by the
/// caller so that a batch can be referenced before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub id: Uuid,
    pub planning_id: Uuid,
    pub external_match_id: String,
    pub team_a: String,
    pub team_b: String,
    pub resolved_team_a_id: Option<Uuid>,
    pub resolved_team_b_id: Option<Uuid>,
    pub court: i32,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub phase: MatchPhase,
    pub pool_id: Option<String>,
    pub matchday: Option<i32>,
    pub status: MatchStatus,
}

/// Bind parameters per inserted match row.
const MATCH_COLUMNS: usize = 14;

/// Insert all matches in one transaction, using multi-row `INSERT`s that
/// stay under the bind parameter limit.
///
/// An empty slice is a no-op and returns an empty vector. On any error no
/// match of the batch is stored.
pub async fn insert_matches(pool: &PgPool, matches: &[NewMatch]) -> Result<Vec<ResolvedMatch>> {
    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut inserted = Vec::with_capacity(matches.len());

    for chunk in matches.chunks(rows_per_statement(MATCH_COLUMNS)) {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO planning_matches (id, planning_id, external_match_id, team_a, team_b, \
             resolved_team_a_id, resolved_team_b_id, court, starts_at, ends_at, phase, pool_id, \
             matchday, status) ",
        );
        builder.push_values(chunk, |mut row, m| {
            row.push_bind(m.id)
                .push_bind(m.planning_id)
                .push_bind(m.external_match_id.as_str())
                .push_bind(m.team_a.as_str())
                .push_bind(m.team_b.as_str())
                .push_bind(m.resolved_team_a_id)
                .push_bind(m.resolved_team_b_id)
                .push_bind(m.court)
                .push_bind(m.starts_at)
                .push_bind(m.ends_at)
                .push_bind(m.phase)
                .push_bind(m.pool_id.as_deref())
                .push_bind(m.matchday)
                .push_bind(m.status);
        });
        builder.push(" RETURNING *");

        let rows = builder
            .build_query_as::<ResolvedMatch>()
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("failed to insert {} matches", chunk.len()))?;
        inserted.extend(rows);
    }

    tx.commit().await.context("failed to commit matches")?;
    Ok(inserted)
}

/// List the matches of a planning in schedule order.
pub async fn list_matches_for_planning(
    pool: &PgPool,
    planning_id: Uuid,
) -> Result<Vec<ResolvedMatch>> {
    let matches = sqlx::query_as::<_, ResolvedMatch>(
        "SELECT * FROM planning_matches WHERE planning_id = $1 ORDER BY starts_at ASC, court ASC",
    )
    .bind(planning_id)
    .fetch_all(pool)
    .await
    .context("failed to list matches for planning")?;

    Ok(matches)
}

/// Delete every match of a planning. Returns the number of rows deleted.
pub async fn delete_matches_for_planning(pool: &PgPool, planning_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM planning_matches WHERE planning_id = $1")
        .bind(planning_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete matches of planning {planning_id}"))?;

    Ok(result.rows_affected())
}
