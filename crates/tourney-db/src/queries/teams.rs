//! Database query functions for the `teams` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Team;

/// Insert a team into a tournament.
pub async fn insert_team(pool: &PgPool, tournament_id: Uuid, name: &str) -> Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        "INSERT INTO teams (tournament_id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(tournament_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert team {name:?}"))?;

    Ok(team)
}

/// List the teams of a tournament in registration order.
pub async fn list_teams_for_tournament(pool: &PgPool, tournament_id: Uuid) -> Result<Vec<Team>> {
    let teams = sqlx::query_as::<_, Team>(
        "SELECT * FROM teams WHERE tournament_id = $1 ORDER BY created_at ASC, name ASC",
    )
    .bind(tournament_id)
    .fetch_all(pool)
    .await
    .context("failed to list teams for tournament")?;

    Ok(teams)
}
