//! Database query functions for the `plannings` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PlanningStatus, TournamentPlanning};

/// Parameters for inserting a new planning row.
#[derive(Debug, Clone)]
pub struct NewPlanning<'a> {
    pub tournament_id: Uuid,
    pub tournament_type: &'a str,
    pub planning_data: &'a serde_json::Value,
    pub total_matches: i32,
    pub ai_comments: Option<&'a str>,
}

/// Insert a new planning. Returns the row with server-generated defaults
/// (id, status, timestamps).
///
/// Fails on the unique index if the tournament already has a planning.
pub async fn insert_planning(pool: &PgPool, new: &NewPlanning<'_>) -> Result<TournamentPlanning> {
    let planning = sqlx::query_as::<_, TournamentPlanning>(
        "INSERT INTO plannings (tournament_id, tournament_type, planning_data, total_matches, ai_comments) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.tournament_id)
    .bind(new.tournament_type)
    .bind(new.planning_data)
    .bind(new.total_matches)
    .bind(new.ai_comments)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert planning for tournament {}", new.tournament_id))?;

    Ok(planning)
}

/// Fetch a planning by its ID.
pub async fn get_planning(pool: &PgPool, id: Uuid) -> Result<Option<TournamentPlanning>> {
    let planning = sqlx::query_as::<_, TournamentPlanning>("SELECT * FROM plannings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch planning")?;

    Ok(planning)
}

/// Fetch the planning of a tournament, if one exists.
pub async fn get_planning_for_tournament(
    pool: &PgPool,
    tournament_id: Uuid,
) -> Result<Option<TournamentPlanning>> {
    let planning = sqlx::query_as::<_, TournamentPlanning>(
        "SELECT * FROM plannings WHERE tournament_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(tournament_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch planning for tournament")?;

    Ok(planning)
}

/// Set the status of a planning and bump `updated_at`.
///
/// Returns `None` when no planning has the given ID.
pub async fn update_planning_status(
    pool: &PgPool,
    id: Uuid,
    status: PlanningStatus,
) -> Result<Option<TournamentPlanning>> {
    let planning = sqlx::query_as::<_, TournamentPlanning>(
        "UPDATE plannings SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to update planning status")?;

    Ok(planning)
}

/// Delete a planning row. Its matches and pools must already be gone.
///
/// Returns the number of rows deleted (0 when it did not exist).
pub async fn delete_planning(pool: &PgPool, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM plannings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete planning {id}"))?;

    Ok(result.rows_affected())
}
