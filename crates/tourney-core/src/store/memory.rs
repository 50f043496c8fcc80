//! In-process [`PlanningStore`].
//!
//! Mirrors the constraints of the PostgreSQL schema that the planner relies
//! on: one planning per tournament, children must reference an existing
//! planning, and a planning cannot be deleted while children remain.
//! Individual operations can be made to fail with [`MemoryStore::fail_on`].

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use tourney_db::models::{
    PlanningStatus, PoolSummary, ResolvedMatch, Team, Tournament, TournamentPlanning,
};
use tourney_db::queries::matches::NewMatch;
use tourney_db::queries::plannings::NewPlanning;
use tourney_db::queries::pools::NewPool;

use super::PlanningStore;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetTournament,
    ListTeams,
    InsertPlanning,
    GetPlanning,
    UpdatePlanningStatus,
    DeletePlanning,
    InsertMatches,
    ListMatches,
    DeleteMatches,
    InsertPools,
    ListPools,
    DeletePools,
}

#[derive(Debug, Default)]
struct Tables {
    tournaments: Vec<Tournament>,
    teams: Vec<Team>,
    plannings: Vec<TournamentPlanning>,
    matches: Vec<ResolvedMatch>,
    pools: Vec<PoolSummary>,
    failing: HashSet<StoreOp>,
}

impl Tables {
    fn check(&self, op: StoreOp) -> Result<()> {
        if self.failing.contains(&op) {
            bail!("injected failure on {op:?}");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later call of `op` fail.
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().failing.insert(op);
    }

    /// Undo [`fail_on`](Self::fail_on).
    pub fn heal(&self, op: StoreOp) {
        self.lock().failing.remove(&op);
    }

    /// Register a ready-to-plan round-robin tournament.
    pub fn add_tournament(&self, name: &str, max_teams: i32, courts_available: i32) -> Tournament {
        let tournament = Tournament {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            tournament_type: Some("round_robin".to_owned()),
            max_teams,
            courts_available,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap_or_default(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            match_duration_minutes: 15,
            break_duration_minutes: 5,
            status: "draft".to_owned(),
            created_at: Utc::now(),
        };
        self.put_tournament(tournament.clone());
        tournament
    }

    /// Insert or replace a tournament as given.
    pub fn put_tournament(&self, tournament: Tournament) {
        let mut tables = self.lock();
        tables.tournaments.retain(|t| t.id != tournament.id);
        tables.tournaments.push(tournament);
    }

    pub fn add_team(&self, tournament_id: Uuid, name: &str) -> Team {
        let team = Team {
            id: Uuid::new_v4(),
            tournament_id,
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.lock().teams.push(team.clone());
        team
    }

    pub fn planning_count(&self) -> usize {
        self.lock().plannings.len()
    }

    pub fn match_count(&self) -> usize {
        self.lock().matches.len()
    }

    pub fn pool_count(&self) -> usize {
        self.lock().pools.len()
    }
}

#[async_trait]
impl PlanningStore for MemoryStore {
    async fn get_tournament(&self, id: Uuid) -> Result<Option<Tournament>> {
        let tables = self.lock();
        tables.check(StoreOp::GetTournament)?;
        Ok(tables.tournaments.iter().find(|t| t.id == id).cloned())
    }

    async fn list_teams(&self, tournament_id: Uuid) -> Result<Vec<Team>> {
        let tables = self.lock();
        tables.check(StoreOp::ListTeams)?;
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn insert_planning(&self, new: &NewPlanning<'_>) -> Result<TournamentPlanning> {
        let mut tables = self.lock();
        tables.check(StoreOp::InsertPlanning)?;
        if tables
            .plannings
            .iter()
            .any(|p| p.tournament_id == new.tournament_id)
        {
            bail!(
                "duplicate key: tournament {} already has a planning",
                new.tournament_id
            );
        }
        let now = Utc::now();
        let planning = TournamentPlanning {
            id: Uuid::new_v4(),
            tournament_id: new.tournament_id,
            tournament_type: new.tournament_type.to_owned(),
            status: PlanningStatus::Generated,
            planning_data: new.planning_data.clone(),
            total_matches: new.total_matches,
            ai_comments: new.ai_comments.map(str::to_owned),
            created_at: now,
            updated_at: now,
        };
        tables.plannings.push(planning.clone());
        Ok(planning)
    }

    async fn get_planning(&self, id: Uuid) -> Result<Option<TournamentPlanning>> {
        let tables = self.lock();
        tables.check(StoreOp::GetPlanning)?;
        Ok(tables.plannings.iter().find(|p| p.id == id).cloned())
    }

    async fn get_planning_for_tournament(
        &self,
        tournament_id: Uuid,
    ) -> Result<Option<TournamentPlanning>> {
        let tables = self.lock();
        tables.check(StoreOp::GetPlanning)?;
        Ok(tables
            .plannings
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn update_planning_status(
        &self,
        id: Uuid,
        status: PlanningStatus,
    ) -> Result<Option<TournamentPlanning>> {
        let mut tables = self.lock();
        tables.check(StoreOp::UpdatePlanningStatus)?;
        Ok(tables.plannings.iter_mut().find(|p| p.id == id).map(|p| {
            p.status = status;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_planning(&self, id: Uuid) -> Result<u64> {
        let mut tables = self.lock();
        tables.check(StoreOp::DeletePlanning)?;
        let referenced = tables.matches.iter().any(|m| m.planning_id == id)
            || tables.pools.iter().any(|p| p.planning_id == id);
        if referenced {
            bail!("foreign key violation: planning {id} still has children");
        }
        let before = tables.plannings.len();
        tables.plannings.retain(|p| p.id != id);
        Ok((before - tables.plannings.len()) as u64)
    }

    async fn insert_matches(&self, new: &[NewMatch]) -> Result<Vec<ResolvedMatch>> {
        let mut tables = self.lock();
        tables.check(StoreOp::InsertMatches)?;
        if let Some(orphan) = new
            .iter()
            .find(|m| !tables.plannings.iter().any(|p| p.id == m.planning_id))
        {
            bail!(
                "foreign key violation: planning {} does not exist",
                orphan.planning_id
            );
        }
        let now = Utc::now();
        let rows: Vec<ResolvedMatch> = new
            .iter()
            .map(|m| ResolvedMatch {
                id: m.id,
                planning_id: m.planning_id,
                external_match_id: m.external_match_id.clone(),
                team_a: m.team_a.clone(),
                team_b: m.team_b.clone(),
                resolved_team_a_id: m.resolved_team_a_id,
                resolved_team_b_id: m.resolved_team_b_id,
                court: m.court,
                starts_at: m.starts_at,
                ends_at: m.ends_at,
                phase: m.phase,
                pool_id: m.pool_id.clone(),
                matchday: m.matchday,
                status: m.status,
                created_at: now,
            })
            .collect();
        tables.matches.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn list_matches(&self, planning_id: Uuid) -> Result<Vec<ResolvedMatch>> {
        let tables = self.lock();
        tables.check(StoreOp::ListMatches)?;
        let mut rows: Vec<ResolvedMatch> = tables
            .matches
            .iter()
            .filter(|m| m.planning_id == planning_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.starts_at, m.court));
        Ok(rows)
    }

    async fn delete_matches(&self, planning_id: Uuid) -> Result<u64> {
        let mut tables = self.lock();
        tables.check(StoreOp::DeleteMatches)?;
        let before = tables.matches.len();
        tables.matches.retain(|m| m.planning_id != planning_id);
        Ok((before - tables.matches.len()) as u64)
    }

    async fn insert_pools(&self, new: &[NewPool]) -> Result<Vec<PoolSummary>> {
        let mut tables = self.lock();
        tables.check(StoreOp::InsertPools)?;
        if let Some(orphan) = new
            .iter()
            .find(|p| !tables.plannings.iter().any(|pl| pl.id == p.planning_id))
        {
            bail!(
                "foreign key violation: planning {} does not exist",
                orphan.planning_id
            );
        }
        let now = Utc::now();
        let rows: Vec<PoolSummary> = new
            .iter()
            .map(|p| PoolSummary {
                id: p.id,
                planning_id: p.planning_id,
                external_pool_id: p.external_pool_id.clone(),
                name: p.name.clone(),
                teams: p.teams.clone(),
                team_count: p.team_count,
                match_count: p.match_count,
                created_at: now,
            })
            .collect();
        tables.pools.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn list_pools(&self, planning_id: Uuid) -> Result<Vec<PoolSummary>> {
        let tables = self.lock();
        tables.check(StoreOp::ListPools)?;
        let mut rows: Vec<PoolSummary> = tables
            .pools
            .iter()
            .filter(|p| p.planning_id == planning_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.external_pool_id.cmp(&b.external_pool_id));
        Ok(rows)
    }

    async fn delete_pools(&self, planning_id: Uuid) -> Result<u64> {
        let mut tables = self.lock();
        tables.check(StoreOp::DeletePools)?;
        let before = tables.pools.len();
        tables.pools.retain(|p| p.planning_id != planning_id);
        Ok((before - tables.pools.len()) as u64)
    }
}
