//! Extraction of storable matches and pools from a planning document.
//!
//! Extraction is pure: it never touches the store. Problems with single
//! matches are reported as [`ExtractionWarning`]s and never abort the batch.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use tourney_db::models::MatchStatus;
use tourney_db::queries::matches::NewMatch;
use tourney_db::queries::pools::NewPool;

use super::document::{MatchDraft, MatchOrigin, PlanningDocument};
use super::resolver::{Resolution, TeamMapping};

/// Which side of a match a team plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Non-fatal problem found while extracting matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// A team name matched neither the roster nor a placeholder prefix.
    UnresolvedTeam {
        match_id: String,
        side: Side,
        name: String,
    },
    /// The match could not be turned into a record and was left out.
    DroppedMatch { match_id: String, reason: String },
    /// The match does not end after it starts. It is kept as written.
    NonPositiveDuration { match_id: String },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedTeam {
                match_id,
                side,
                name,
            } => write!(f, "match {match_id}: team {side} {name:?} not found"),
            Self::DroppedMatch { match_id, reason } => {
                write!(f, "match {match_id} dropped: {reason}")
            }
            Self::NonPositiveDuration { match_id } => {
                write!(f, "match {match_id} does not end after it starts")
            }
        }
    }
}

/// Reasons a single match cannot be stored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchBuildError {
    #[error("court {0} is out of range")]
    CourtOutOfRange(i64),

    #[error("matchday {0} is out of range")]
    MatchdayOutOfRange(i64),
}

/// Matches extracted from a document, plus what went wrong on the way.
#[derive(Debug, Default)]
pub struct MatchExtraction {
    pub matches: Vec<NewMatch>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Build the match records of every phase, in document order
/// (round-robin, pools, bracket).
pub fn extract_matches(
    document: &PlanningDocument,
    planning_id: Uuid,
    teams: &TeamMapping,
) -> MatchExtraction {
    let mut extraction = MatchExtraction::default();

    for (origin, draft) in document.scheduled_matches() {
        match build_match(planning_id, origin, draft, teams, &mut extraction.warnings) {
            Ok(record) => extraction.matches.push(record),
            Err(e) => {
                warn!(match_id = %draft.match_id, error = %e, "dropping match");
                extraction.warnings.push(ExtractionWarning::DroppedMatch {
                    match_id: draft.match_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        %planning_id,
        matches = extraction.matches.len(),
        warnings = extraction.warnings.len(),
        "matches extracted"
    );
    extraction
}

fn build_match(
    planning_id: Uuid,
    origin: MatchOrigin<'_>,
    draft: &MatchDraft,
    teams: &TeamMapping,
    warnings: &mut Vec<ExtractionWarning>,
) -> Result<NewMatch, MatchBuildError> {
    let court = i32::try_from(draft.court)
        .ok()
        .filter(|c| *c >= 0)
        .ok_or(MatchBuildError::CourtOutOfRange(draft.court))?;

    let (pool_id, matchday) = match origin {
        MatchOrigin::RoundRobin { matchday } => {
            let matchday = matchday
                .map(|d| i32::try_from(d).map_err(|_| MatchBuildError::MatchdayOutOfRange(d)))
                .transpose()?;
            (None, matchday)
        }
        MatchOrigin::Pool { pool_id } => (Some(pool_id.to_owned()), None),
        MatchOrigin::Bracket(_) => (None, None),
    };

    let resolved_team_a_id = resolve_side(teams, draft, Side::A, warnings);
    let resolved_team_b_id = resolve_side(teams, draft, Side::B, warnings);

    if draft.ends_at <= draft.starts_at {
        warnings.push(ExtractionWarning::NonPositiveDuration {
            match_id: draft.match_id.clone(),
        });
    }

    Ok(NewMatch {
        id: Uuid::new_v4(),
        planning_id,
        external_match_id: draft.match_id.clone(),
        team_a: draft.team_a.clone(),
        team_b: draft.team_b.clone(),
        resolved_team_a_id,
        resolved_team_b_id,
        court,
        starts_at: draft.starts_at,
        ends_at: draft.ends_at,
        phase: origin.phase(),
        pool_id,
        matchday,
        status: MatchStatus::Scheduled,
    })
}

fn resolve_side(
    teams: &TeamMapping,
    draft: &MatchDraft,
    side: Side,
    warnings: &mut Vec<ExtractionWarning>,
) -> Option<Uuid> {
    let name = match side {
        Side::A => &draft.team_a,
        Side::B => &draft.team_b,
    };
    let resolution = teams.resolve(name);
    if resolution == Resolution::Unknown {
        warn!(match_id = %draft.match_id, %side, team = %name, "team not found");
        warnings.push(ExtractionWarning::UnresolvedTeam {
            match_id: draft.match_id.clone(),
            side,
            name: name.clone(),
        });
    }
    resolution.team_id()
}

/// Build one pool summary per pool. Counts reflect the document as given.
pub fn extract_pools(document: &PlanningDocument, planning_id: Uuid) -> Vec<NewPool> {
    document
        .pools
        .iter()
        .map(|pool| NewPool {
            id: Uuid::new_v4(),
            planning_id,
            external_pool_id: pool.pool_id.clone(),
            name: pool.name.clone(),
            teams: pool.teams.clone(),
            team_count: saturating_i32(pool.teams.len()),
            match_count: saturating_i32(pool.matches.len()),
        })
        .collect()
}

pub(crate) fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
