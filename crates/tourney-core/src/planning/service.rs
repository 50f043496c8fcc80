//! Planning service layer.
//!
//! Saves a planning document as one planning row, its matches and its pools.
//! The store has no cross-table transaction, so a failure after the planning
//! row exists is compensated by deleting everything written for that
//! planning id.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tourney_db::models::{PlanningStatus, PoolSummary, ResolvedMatch, TournamentPlanning};
use tourney_db::queries::plannings::NewPlanning;

use crate::generator::PlanningGenerator;
use crate::store::PlanningStore;

use super::document::{DocumentError, PlanningDocument, parse_planning_response};
use super::error::{PlanningError, Stage};
use super::extract::{ExtractionWarning, extract_matches, extract_pools};
use super::prompt::build_planning_prompt;
use super::resolver::load_team_mapping;
use super::validate::validate_tournament;

/// A planning that was just persisted, with what was stored under it.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningOutcome {
    pub planning: TournamentPlanning,
    pub matches: Vec<ResolvedMatch>,
    pub pools: Vec<PoolSummary>,
    pub warnings: Vec<ExtractionWarning>,
}

/// A stored planning with its matches (by start time) and pools.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningDetails {
    #[serde(flatten)]
    pub planning: TournamentPlanning,
    pub matches: Vec<ResolvedMatch>,
    pub pools: Vec<PoolSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningStatusView {
    pub planning_id: Uuid,
    pub tournament_id: Uuid,
    pub status: PlanningStatus,
    pub total_matches: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<&TournamentPlanning> for PlanningStatusView {
    fn from(p: &TournamentPlanning) -> Self {
        Self {
            planning_id: p.id,
            tournament_id: p.tournament_id,
            status: p.status,
            total_matches: p.total_matches,
            updated_at: p.updated_at,
        }
    }
}

/// Rows removed by a delete. All zero when there was nothing to delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub plannings: u64,
    pub matches: u64,
    pub pools: u64,
}

impl DeleteReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Entry point for every planning operation.
///
/// Holds the store and, when generation is needed, the generator. Cheap to
/// clone.
#[derive(Clone)]
pub struct Planner {
    store: Arc<dyn PlanningStore>,
    generator: Option<Arc<dyn PlanningGenerator>>,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_owned()))
            .finish_non_exhaustive()
    }
}

impl Planner {
    pub fn new(store: Arc<dyn PlanningStore>) -> Self {
        Self {
            store,
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn PlanningGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn store(&self) -> &dyn PlanningStore {
        self.store.as_ref()
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Generate a planning for a tournament and persist it, replacing the
    /// tournament's current planning if there is one.
    pub async fn generate_planning(
        &self,
        tournament_id: Uuid,
    ) -> Result<PlanningOutcome, PlanningError> {
        let raw = self.request_document(tournament_id).await?;
        self.replace_planning(tournament_id, &raw).await
    }

    /// Replace a planning with a freshly generated one for the same
    /// tournament.
    ///
    /// The new document is obtained before the old planning is deleted, so
    /// a generator failure leaves the old planning in place.
    pub async fn regenerate_planning(
        &self,
        planning_id: Uuid,
    ) -> Result<PlanningOutcome, PlanningError> {
        let previous = self.get_planning(planning_id).await?;
        info!(%planning_id, tournament_id = %previous.tournament_id, "regenerating planning");

        let raw = self.request_document(previous.tournament_id).await?;
        let document = PlanningDocument::from_value(&raw)?;

        self.purge(planning_id)
            .await
            .map_err(PlanningError::storage(Stage::ReplacePrevious))?;
        self.persist(previous.tournament_id, &raw, &document).await
    }

    /// Validate the tournament, prompt the generator and parse its reply.
    async fn request_document(&self, tournament_id: Uuid) -> Result<Value, PlanningError> {
        let tournament = self
            .store
            .get_tournament(tournament_id)
            .await
            .map_err(PlanningError::storage(Stage::LoadTournament))?
            .ok_or(PlanningError::TournamentNotFound(tournament_id))?;
        let teams = self
            .store
            .list_teams(tournament_id)
            .await
            .map_err(PlanningError::storage(Stage::LoadTournament))?;

        validate_tournament(&tournament, &teams)?;

        let generator = self.generator.as_ref().ok_or_else(|| {
            PlanningError::Generation(anyhow!("no planning generator configured"))
        })?;

        let prompt = build_planning_prompt(&tournament, &teams);
        debug!(
            %tournament_id,
            generator = generator.name(),
            prompt_len = prompt.len(),
            "requesting planning"
        );
        let reply = generator
            .generate(&prompt)
            .await
            .map_err(PlanningError::Generation)?;

        Ok(parse_planning_response(&reply)?)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Persist a document as the tournament's planning, deleting the
    /// current one first. The document is validated before anything is
    /// deleted.
    pub async fn replace_planning(
        &self,
        tournament_id: Uuid,
        raw: &Value,
    ) -> Result<PlanningOutcome, PlanningError> {
        let document = PlanningDocument::from_value(raw)?;

        let existing = self
            .store
            .get_planning_for_tournament(tournament_id)
            .await
            .map_err(PlanningError::storage(Stage::ReplacePrevious))?;
        if let Some(existing) = existing {
            info!(planning_id = %existing.id, %tournament_id, "replacing existing planning");
            self.purge(existing.id)
                .await
                .map_err(PlanningError::storage(Stage::ReplacePrevious))?;
        }

        self.persist(tournament_id, raw, &document).await
    }

    /// Persist a document as a new planning of `tournament_id`.
    ///
    /// Either the planning, all its matches and all its pools are stored,
    /// or (barring a failed rollback) nothing is.
    pub async fn save_planning(
        &self,
        tournament_id: Uuid,
        raw: &Value,
    ) -> Result<PlanningOutcome, PlanningError> {
        let document = PlanningDocument::from_value(raw)?;
        self.persist(tournament_id, raw, &document).await
    }

    async fn persist(
        &self,
        tournament_id: Uuid,
        raw: &Value,
        document: &PlanningDocument,
    ) -> Result<PlanningOutcome, PlanningError> {
        let match_count = document.match_count();
        let total_matches = i32::try_from(match_count)
            .map_err(|_| DocumentError::TooManyMatches(match_count))?;

        let planning = self
            .store
            .insert_planning(&NewPlanning {
                tournament_id,
                tournament_type: &document.tournament_type,
                planning_data: raw,
                total_matches,
                ai_comments: document.commentary.as_deref(),
            })
            .await
            .map_err(PlanningError::storage(Stage::SavePlanning))?;
        info!(planning_id = %planning.id, %tournament_id, total_matches, "planning saved");

        let teams = match load_team_mapping(self.store.as_ref(), tournament_id).await {
            Ok(teams) => teams,
            Err(e) => return Err(self.roll_back(planning.id, Stage::ResolveTeams, e).await),
        };

        let extraction = extract_matches(document, planning.id, &teams);
        let matches = if extraction.matches.is_empty() {
            Vec::new()
        } else {
            match self.store.insert_matches(&extraction.matches).await {
                Ok(rows) => rows,
                Err(e) => return Err(self.roll_back(planning.id, Stage::SaveMatches, e).await),
            }
        };
        info!(planning_id = %planning.id, count = matches.len(), "matches saved");

        let new_pools = extract_pools(document, planning.id);
        let pools = if new_pools.is_empty() {
            Vec::new()
        } else {
            match self.store.insert_pools(&new_pools).await {
                Ok(rows) => rows,
                Err(e) => return Err(self.roll_back(planning.id, Stage::SavePools, e).await),
            }
        };
        info!(planning_id = %planning.id, count = pools.len(), "pools saved");

        if !extraction.warnings.is_empty() {
            warn!(
                planning_id = %planning.id,
                warnings = extraction.warnings.len(),
                "planning saved with warnings"
            );
        }

        Ok(PlanningOutcome {
            planning,
            matches,
            pools,
            warnings: extraction.warnings,
        })
    }

    /// Undo a partially saved planning and build the error for `stage`.
    async fn roll_back(
        &self,
        planning_id: Uuid,
        stage: Stage,
        source: anyhow::Error,
    ) -> PlanningError {
        warn!(%planning_id, %stage, error = %source, "saving planning failed, rolling back");
        match self.purge(planning_id).await {
            Ok(report) => {
                debug!(%planning_id, ?report, "rollback complete");
                PlanningError::Storage { stage, source }
            }
            Err(rollback) => {
                error!(%planning_id, error = %rollback, "rollback incomplete");
                PlanningError::RollbackIncomplete {
                    stage,
                    planning_id,
                    source,
                }
            }
        }
    }

    /// Delete a planning's matches, pools and row. All three deletes are
    /// attempted even if one fails; the first failure is returned.
    async fn purge(&self, planning_id: Uuid) -> anyhow::Result<DeleteReport> {
        let matches = self.store.delete_matches(planning_id).await;
        let pools = self.store.delete_pools(planning_id).await;
        let plannings = self.store.delete_planning(planning_id).await;
        Ok(DeleteReport {
            matches: matches?,
            pools: pools?,
            plannings: plannings?,
        })
    }

    // -----------------------------------------------------------------------
    // Deletion and status
    // -----------------------------------------------------------------------

    /// Delete a planning and everything under it. Deleting a planning that
    /// does not exist is a no-op.
    pub async fn delete_planning(&self, planning_id: Uuid) -> Result<DeleteReport, PlanningError> {
        let report = self
            .purge(planning_id)
            .await
            .map_err(PlanningError::storage(Stage::Delete))?;
        if report.is_noop() {
            debug!(%planning_id, "nothing to delete");
        } else {
            info!(%planning_id, matches = report.matches, pools = report.pools, "planning deleted");
        }
        Ok(report)
    }

    pub async fn update_planning_status(
        &self,
        planning_id: Uuid,
        status: PlanningStatus,
    ) -> Result<TournamentPlanning, PlanningError> {
        let planning = self
            .store
            .update_planning_status(planning_id, status)
            .await
            .map_err(PlanningError::storage(Stage::UpdateStatus))?
            .ok_or(PlanningError::PlanningNotFound(planning_id))?;
        info!(%planning_id, %status, "planning status updated");
        Ok(planning)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub async fn planning_status(
        &self,
        planning_id: Uuid,
    ) -> Result<PlanningStatusView, PlanningError> {
        let planning = self.get_planning(planning_id).await?;
        Ok(PlanningStatusView::from(&planning))
    }

    pub async fn get_planning(&self, planning_id: Uuid) -> Result<TournamentPlanning, PlanningError> {
        self.store
            .get_planning(planning_id)
            .await
            .map_err(PlanningError::storage(Stage::Lookup))?
            .ok_or(PlanningError::PlanningNotFound(planning_id))
    }

    pub async fn get_planning_for_tournament(
        &self,
        tournament_id: Uuid,
    ) -> Result<TournamentPlanning, PlanningError> {
        self.store
            .get_planning_for_tournament(tournament_id)
            .await
            .map_err(PlanningError::storage(Stage::Lookup))?
            .ok_or(PlanningError::NoPlanningForTournament(tournament_id))
    }

    pub async fn get_planning_details(
        &self,
        planning_id: Uuid,
    ) -> Result<PlanningDetails, PlanningError> {
        let planning = self.get_planning(planning_id).await?;
        self.details(planning).await
    }

    pub async fn get_planning_details_for_tournament(
        &self,
        tournament_id: Uuid,
    ) -> Result<PlanningDetails, PlanningError> {
        let planning = self.get_planning_for_tournament(tournament_id).await?;
        self.details(planning).await
    }

    async fn details(&self, planning: TournamentPlanning) -> Result<PlanningDetails, PlanningError> {
        let matches = self
            .store
            .list_matches(planning.id)
            .await
            .map_err(PlanningError::storage(Stage::Lookup))?;
        let pools = self
            .store
            .list_pools(planning.id)
            .await
            .map_err(PlanningError::storage(Stage::Lookup))?;
        Ok(PlanningDetails {
            planning,
            matches,
            pools,
        })
    }
}
