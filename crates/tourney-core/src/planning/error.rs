use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use super::document::DocumentError;
use super::validate::TournamentValidationError;

/// Step of a planner operation that touched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadTournament,
    ReplacePrevious,
    SavePlanning,
    ResolveTeams,
    SaveMatches,
    SavePools,
    Delete,
    Lookup,
    UpdateStatus,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LoadTournament => "load tournament",
            Self::ReplacePrevious => "replace previous planning",
            Self::SavePlanning => "save planning",
            Self::ResolveTeams => "resolve teams",
            Self::SaveMatches => "save matches",
            Self::SavePools => "save pools",
            Self::Delete => "delete planning",
            Self::Lookup => "lookup",
            Self::UpdateStatus => "update status",
        };
        f.write_str(s)
    }
}

/// Error returned by [`Planner`](super::Planner) operations.
///
/// Storage errors never escape raw: they are wrapped with the stage that
/// failed. `RollbackIncomplete` means rows of the failed attempt may still
/// be in the store.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("invalid planning document: {0}")]
    InvalidDocument(#[from] DocumentError),

    #[error("tournament {0} not found")]
    TournamentNotFound(Uuid),

    #[error("planning {0} not found")]
    PlanningNotFound(Uuid),

    #[error("tournament {0} has no planning")]
    NoPlanningForTournament(Uuid),

    #[error("tournament is not ready for planning: {0}")]
    TournamentNotReady(#[from] TournamentValidationError),

    #[error("planning generator failed")]
    Generation(#[source] anyhow::Error),

    #[error("storage failure during {stage}")]
    Storage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage failure during {stage}, and rollback of planning {planning_id} was incomplete")]
    RollbackIncomplete {
        stage: Stage,
        planning_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

impl PlanningError {
    pub(crate) fn storage(stage: Stage) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Storage { stage, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TournamentNotFound(_)
                | Self::PlanningNotFound(_)
                | Self::NoPlanningForTournament(_)
        )
    }

    /// Whether the caller sent something unusable, as opposed to the
    /// system failing.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidDocument(_) | Self::TournamentNotReady(_))
    }
}
