//! PostgreSQL-backed [`PlanningStore`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tourney_db::models::{
    PlanningStatus, PoolSummary, ResolvedMatch, Team, Tournament, TournamentPlanning,
};
use tourney_db::queries::matches::{self, NewMatch};
use tourney_db::queries::plannings::{self, NewPlanning};
use tourney_db::queries::pools::{self, NewPool};
use tourney_db::queries::{teams, tournaments};

use super::PlanningStore;

/// Store backed by a connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PlanningStore for PgStore {
    async fn get_tournament(&self, id: Uuid) -> Result<Option<Tournament>> {
        tournaments::get_tournament(&self.pool, id).await
    }

    async fn list_teams(&self, tournament_id: Uuid) -> Result<Vec<Team>> {
        teams::list_teams_for_tournament(&self.pool, tournament_id).await
    }

    async fn insert_planning(&self, new: &NewPlanning<'_>) -> Result<TournamentPlanning> {
        plannings::insert_planning(&self.pool, new).await
    }

    async fn get_planning(&self, id: Uuid) -> Result<Option<TournamentPlanning>> {
        plannings::get_planning(&self.pool, id).await
    }

    async fn get_planning_for_tournament(
        &self,
        tournament_id: Uuid,
    ) -> Result<Option<TournamentPlanning>> {
        plannings::get_planning_for_tournament(&self.pool, tournament_id).await
    }

    async fn update_planning_status(
        &self,
        id: Uuid,
        status: PlanningStatus,
    ) -> Result<Option<TournamentPlanning>> {
        plannings::update_planning_status(&self.pool, id, status).await
    }

    async fn delete_planning(&self, id: Uuid) -> Result<u64> {
        plannings::delete_planning(&self.pool, id).await
    }

    async fn insert_matches(&self, new: &[NewMatch]) -> Result<Vec<ResolvedMatch>> {
        matches::insert_matches(&self.pool, new).await
    }

    async fn list_matches(&self, planning_id: Uuid) -> Result<Vec<ResolvedMatch>> {
        matches::list_matches_for_planning(&self.pool, planning_id).await
    }

    async fn delete_matches(&self, planning_id: Uuid) -> Result<u64> {
        matches::delete_matches_for_planning(&self.pool, planning_id).await
    }

    async fn insert_pools(&self, new: &[NewPool]) -> Result<Vec<PoolSummary>> {
        pools::insert_pools(&self.pool, new).await
    }

    async fn list_pools(&self, planning_id: Uuid) -> Result<Vec<PoolSummary>> {
        pools::list_pools_for_planning(&self.pool, planning_id).await
    }

    async fn delete_pools(&self, planning_id: Uuid) -> Result<u64> {
        pools::delete_pools_for_planning(&self.pool, planning_id).await
    }
}
