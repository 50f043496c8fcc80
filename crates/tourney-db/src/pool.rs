//! Connection pool, database bootstrap and schema migrations for the
//! tournament planning store.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, FromRow, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/tourney-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open the pool used by the planner and the API server.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to planning store at {}", config.database_url))?;
    debug!(max_connections = MAX_CONNECTIONS, "planning store pool ready");
    Ok(pool)
}

/// Apply the tournament and planning schema. Already applied versions are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate the planning schema")?;

    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0);
    info!(schema_version = latest, "planning schema up to date");
    Ok(())
}

// -----------------------------------------------------------------------
// Database bootstrap
// -----------------------------------------------------------------------

/// What `ensure_database_exists` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseSetup {
    Created,
    AlreadyPresent,
}

/// Check that `name` can be spliced into `CREATE DATABASE` unquoted.
///
/// PostgreSQL folds unquoted identifiers to lowercase, so an uppercase name
/// would create a database other than the one the URL points at.
pub fn check_database_name(name: &str) -> Result<()> {
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let rest_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !starts_ok || !rest_ok {
        anyhow::bail!(
            "database name {name:?} must be lowercase ASCII letters, digits or '_' and not start with a digit"
        );
    }
    Ok(())
}

/// Create the planning database named in `config` when the server lacks it.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<DatabaseSetup> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    check_database_name(db_name)?;

    let maintenance_url = config.maintenance_url();
    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let outcome = create_if_missing(&maint_pool, db_name).await;
    maint_pool.close().await;

    let outcome = outcome?;
    info!(db = db_name, ?outcome, "planning database checked");
    Ok(outcome)
}

async fn create_if_missing(maint_pool: &PgPool, db_name: &str) -> Result<DatabaseSetup> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(maint_pool)
            .await
            .context("failed to query pg_database")?;
    if exists {
        return Ok(DatabaseSetup::AlreadyPresent);
    }

    // CREATE DATABASE takes no bind parameters.
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .with_context(|| format!("failed to create database {db_name}"))?;
    Ok(DatabaseSetup::Created)
}

// -----------------------------------------------------------------------
// Store summary
// -----------------------------------------------------------------------

/// Row counts of the planning store, printed after `db-init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct StoreSummary {
    pub tournaments: i64,
    pub teams: i64,
    pub plannings: i64,
    pub matches: i64,
    pub pools: i64,
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tournaments, {} teams, {} plannings, {} matches, {} pools",
            self.tournaments, self.teams, self.plannings, self.matches, self.pools
        )
    }
}

/// Count the rows of every table the planner reads or writes.
pub async fn store_summary(pool: &PgPool) -> Result<StoreSummary> {
    sqlx::query_as::<_, StoreSummary>(
        "SELECT \
            (SELECT count(*) FROM tournaments) AS tournaments, \
            (SELECT count(*) FROM teams) AS teams, \
            (SELECT count(*) FROM plannings) AS plannings, \
            (SELECT count(*) FROM planning_matches) AS matches, \
            (SELECT count(*) FROM planning_pools) AS pools",
    )
    .fetch_one(pool)
    .await
    .context("failed to summarize the planning store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_database_names() {
        check_database_name("tourney").unwrap();
        check_database_name("tourney_test_0f3a").unwrap();
        check_database_name("_scratch").unwrap();
    }

    #[test]
    fn rejects_names_postgres_would_rewrite_or_reject() {
        for name in ["", "Tourney", "9lives", "tourney-dev", "tourney; DROP", "télé"] {
            assert!(check_database_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn summary_display_lists_every_table() {
        let summary = StoreSummary {
            tournaments: 1,
            teams: 8,
            plannings: 1,
            matches: 28,
            pools: 2,
        };
        assert_eq!(
            summary.to_string(),
            "1 tournaments, 8 teams, 1 plannings, 28 matches, 2 pools"
        );
    }
}
