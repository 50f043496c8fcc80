//! Team name resolution.
//!
//! The generator refers to teams by display name. Names of teams that are
//! only known once earlier matches are played (`winner_qf_1`, `1er_P1`, ...)
//! are placeholders: they never resolve and are not reported.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use tourney_db::models::Team;

use crate::store::PlanningStore;

/// Prefixes marking a participant decided by bracket progression.
pub const PLACEHOLDER_PREFIXES: [&str; 4] = ["winner_", "loser_", "1er_", "2e_"];

/// Whether `name` denotes a participant that is not yet known.
pub fn is_placeholder(name: &str) -> bool {
    PLACEHOLDER_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Outcome of resolving one team name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Uuid),
    Placeholder,
    Unknown,
}

impl Resolution {
    pub fn team_id(self) -> Option<Uuid> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Placeholder | Self::Unknown => None,
        }
    }
}

/// Display name to team ID map for one tournament.
#[derive(Debug, Clone, Default)]
pub struct TeamMapping {
    ids: HashMap<String, Uuid>,
}

impl TeamMapping {
    /// Build the mapping from a roster. When two teams share a display name
    /// the later one wins.
    pub fn from_teams<'a>(teams: impl IntoIterator<Item = &'a Team>) -> Self {
        let mut ids = HashMap::new();
        for team in teams {
            if let Some(previous) = ids.insert(team.name.clone(), team.id) {
                warn!(
                    name = %team.name,
                    dropped = %previous,
                    kept = %team.id,
                    "duplicate team name in tournament"
                );
            }
        }
        Self { ids }
    }

    pub fn resolve(&self, name: &str) -> Resolution {
        match self.ids.get(name) {
            Some(id) => Resolution::Resolved(*id),
            None if is_placeholder(name) => Resolution::Placeholder,
            None => Resolution::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<(String, Uuid)> for TeamMapping {
    fn from_iter<I: IntoIterator<Item = (String, Uuid)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Load the name mapping for a tournament.
///
/// A tournament without teams (or unknown to the store) yields an empty
/// mapping, and every match is then stored unresolved. Only a failing store
/// is an error.
pub async fn load_team_mapping(
    store: &dyn PlanningStore,
    tournament_id: Uuid,
) -> Result<TeamMapping> {
    let teams = store
        .list_teams(tournament_id)
        .await
        .with_context(|| format!("failed to load teams of tournament {tournament_id}"))?;

    let mapping = TeamMapping::from_teams(&teams);
    if mapping.is_empty() {
        warn!(%tournament_id, "tournament has no teams; matches will be stored unresolved");
    } else {
        debug!(%tournament_id, teams = mapping.len(), "team mapping loaded");
    }
    Ok(mapping)
}
