//! Database query functions for the `tournaments` table.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Tournament;

/// Parameters for inserting a tournament.
#[derive(Debug, Clone)]
pub struct NewTournament<'a> {
    pub name: &'a str,
    pub tournament_type: Option<&'a str>,
    pub max_teams: i32,
    pub courts_available: i32,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub match_duration_minutes: i32,
    pub break_duration_minutes: i32,
}

/// Insert a tournament. Returns the row with server-generated defaults.
pub async fn insert_tournament(pool: &PgPool, new: &NewTournament<'_>) -> Result<Tournament> {
    let tournament = sqlx::query_as::<_, Tournament>(
        "INSERT INTO tournaments (name, tournament_type, max_teams, courts_available, \
         start_date, start_time, match_duration_minutes, break_duration_minutes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.tournament_type)
    .bind(new.max_teams)
    .bind(new.courts_available)
    .bind(new.start_date)
    .bind(new.start_time)
    .bind(new.match_duration_minutes)
    .bind(new.break_duration_minutes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert tournament {:?}", new.name))?;

    Ok(tournament)
}

/// Fetch a tournament by its ID.
pub async fn get_tournament(pool: &PgPool, id: Uuid) -> Result<Option<Tournament>> {
    let tournament = sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch tournament")?;

    Ok(tournament)
}
