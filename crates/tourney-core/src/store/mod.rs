//! Storage interface for plannings and their children.
//!
//! The planner only ever talks to a [`PlanningStore`]. [`PgStore`] is the
//! production implementation; [`MemoryStore`] keeps everything in process
//! and can be told to fail specific operations.

pub mod memory;
pub mod pg;

pub use memory::{MemoryStore, StoreOp};
pub use pg::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use tourney_db::models::{
    PlanningStatus, PoolSummary, ResolvedMatch, Team, Tournament, TournamentPlanning,
};
use tourney_db::queries::matches::NewMatch;
use tourney_db::queries::plannings::NewPlanning;
use tourney_db::queries::pools::NewPool;

/// Persistence operations needed to save, read and delete plannings.
///
/// Every method is a single statement against the backing store. Deletes
/// report how many rows went away so callers can tell a no-op apart.
#[async_trait]
pub trait PlanningStore: Send + Sync {
    async fn get_tournament(&self, id: Uuid) -> Result<Option<Tournament>>;

    async fn list_teams(&self, tournament_id: Uuid) -> Result<Vec<Team>>;

    async fn insert_planning(&self, new: &NewPlanning<'_>) -> Result<TournamentPlanning>;

    async fn get_planning(&self, id: Uuid) -> Result<Option<TournamentPlanning>>;

    async fn get_planning_for_tournament(
        &self,
        tournament_id: Uuid,
    ) -> Result<Option<TournamentPlanning>>;

    async fn update_planning_status(
        &self,
        id: Uuid,
        status: PlanningStatus,
    ) -> Result<Option<TournamentPlanning>>;

    async fn delete_planning(&self, id: Uuid) -> Result<u64>;

    /// Insert all matches at once. Either every row is stored or none is.
    async fn insert_matches(&self, matches: &[NewMatch]) -> Result<Vec<ResolvedMatch>>;

    async fn list_matches(&self, planning_id: Uuid) -> Result<Vec<ResolvedMatch>>;

    async fn delete_matches(&self, planning_id: Uuid) -> Result<u64>;

    /// Insert all pools at once. Either every row is stored or none is.
    async fn insert_pools(&self, pools: &[NewPool]) -> Result<Vec<PoolSummary>>;

    async fn list_pools(&self, planning_id: Uuid) -> Result<Vec<PoolSummary>>;

    async fn delete_pools(&self, planning_id: Uuid) -> Result<u64>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanningStore) {}
};
