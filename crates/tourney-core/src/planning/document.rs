//! The planning document returned by the generator.
//!
//! The generator speaks French on the wire (`type_tournoi`, `poules`, ...).
//! Parsing validates the shape once at the boundary; everything downstream
//! works with the typed [`PlanningDocument`] and its per-phase views.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use tourney_db::models::MatchPhase;

/// Errors raised while turning generator output into a [`PlanningDocument`].
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("response must be a JSON object")]
    NotAnObject,

    #[error("missing field type_tournoi")]
    MissingTournamentType,

    #[error("malformed planning document: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("planning document schedules {0} matches, more than can be stored")]
    TooManyMatches(usize),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A complete schedule as produced by the generator.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanningDocument {
    #[serde(rename = "type_tournoi")]
    pub tournament_type: String,

    #[serde(rename = "matchs_round_robin", default, deserialize_with = "null_as_empty")]
    pub round_robin: Vec<MatchDraft>,

    #[serde(rename = "poules", default, deserialize_with = "null_as_empty")]
    pub pools: Vec<PoolDraft>,

    #[serde(rename = "phase_elimination_apres_poules", default)]
    pub elimination: Option<EliminationBracket>,

    #[serde(rename = "commentaires", default)]
    pub commentary: Option<String>,
}

/// One match as written by the generator, before team resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchDraft {
    pub match_id: String,

    #[serde(rename = "equipe_a")]
    pub team_a: String,

    #[serde(rename = "equipe_b")]
    pub team_b: String,

    #[serde(rename = "terrain")]
    pub court: i64,

    #[serde(rename = "debut_horaire", deserialize_with = "timestamp")]
    pub starts_at: NaiveDateTime,

    #[serde(rename = "fin_horaire", deserialize_with = "timestamp")]
    pub ends_at: NaiveDateTime,

    #[serde(rename = "journee", default)]
    pub matchday: Option<i64>,
}

/// A pool (poule): a roster of team names and the matches played inside it.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolDraft {
    #[serde(rename = "poule_id")]
    pub pool_id: String,

    #[serde(rename = "nom_poule")]
    pub name: String,

    #[serde(rename = "equipes", default, deserialize_with = "null_as_empty")]
    pub teams: Vec<String>,

    #[serde(rename = "matchs", default, deserialize_with = "null_as_empty")]
    pub matches: Vec<MatchDraft>,
}

/// Single-elimination bracket played after the pools.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EliminationBracket {
    #[serde(rename = "quarts", default, deserialize_with = "null_as_empty")]
    pub quarterfinals: Vec<MatchDraft>,

    #[serde(rename = "demi_finales", default, deserialize_with = "null_as_empty")]
    pub semifinals: Vec<MatchDraft>,

    #[serde(rename = "finale", default)]
    pub final_match: Option<MatchDraft>,

    #[serde(rename = "match_troisieme_place", default)]
    pub third_place: Option<MatchDraft>,
}

// ---------------------------------------------------------------------------
// Phase views
// ---------------------------------------------------------------------------

/// One structurally distinct part of a document.
#[derive(Debug, Clone, Copy)]
pub enum PhaseSection<'a> {
    RoundRobin(&'a [MatchDraft]),
    Pools(&'a [PoolDraft]),
    Bracket(&'a EliminationBracket),
}

/// Round of the elimination bracket a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketRound {
    QuarterFinal,
    SemiFinal,
    Final,
    ThirdPlace,
}

impl BracketRound {
    /// Only the final is stored as its own phase.
    pub fn phase(self) -> MatchPhase {
        match self {
            Self::Final => MatchPhase::Finale,
            Self::QuarterFinal | Self::SemiFinal | Self::ThirdPlace => MatchPhase::Elimination,
        }
    }
}

/// Where in the document a match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOrigin<'a> {
    RoundRobin { matchday: Option<i64> },
    Pool { pool_id: &'a str },
    Bracket(BracketRound),
}

impl MatchOrigin<'_> {
    pub fn phase(&self) -> MatchPhase {
        match self {
            Self::RoundRobin { .. } => MatchPhase::RoundRobin,
            Self::Pool { .. } => MatchPhase::Poules,
            Self::Bracket(round) => round.phase(),
        }
    }
}

impl PlanningDocument {
    /// Parse and validate a document from an already-decoded JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, DocumentError> {
        let object = value.as_object().ok_or(DocumentError::NotAnObject)?;
        let has_type = object
            .get("type_tournoi")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|t| !t.trim().is_empty());
        if !has_type {
            return Err(DocumentError::MissingTournamentType);
        }
        Self::deserialize(value).map_err(DocumentError::Malformed)
    }

    /// Sections present in the document, in extraction order:
    /// round-robin, pools, then the bracket when there is one.
    pub fn sections(&self) -> impl Iterator<Item = PhaseSection<'_>> {
        [
            Some(PhaseSection::RoundRobin(&self.round_robin)),
            Some(PhaseSection::Pools(&self.pools)),
            self.elimination.as_ref().map(PhaseSection::Bracket),
        ]
        .into_iter()
        .flatten()
    }

    /// Every match of the document tagged with its origin, in extraction
    /// order. Within the bracket: quarterfinals, semifinals, final, then the
    /// third-place match.
    pub fn scheduled_matches(&self) -> Vec<(MatchOrigin<'_>, &MatchDraft)> {
        let mut out = Vec::new();
        for section in self.sections() {
            match section {
                PhaseSection::RoundRobin(matches) => {
                    out.extend(matches.iter().map(|m| {
                        (
                            MatchOrigin::RoundRobin {
                                matchday: m.matchday,
                            },
                            m,
                        )
                    }));
                }
                PhaseSection::Pools(pools) => {
                    for pool in pools {
                        out.extend(pool.matches.iter().map(|m| {
                            (
                                MatchOrigin::Pool {
                                    pool_id: &pool.pool_id,
                                },
                                m,
                            )
                        }));
                    }
                }
                PhaseSection::Bracket(bracket) => {
                    let rounds = [
                        (BracketRound::QuarterFinal, bracket.quarterfinals.as_slice()),
                        (BracketRound::SemiFinal, bracket.semifinals.as_slice()),
                        (BracketRound::Final, bracket.final_match.as_slice()),
                        (BracketRound::ThirdPlace, bracket.third_place.as_slice()),
                    ];
                    for (round, matches) in rounds {
                        out.extend(matches.iter().map(|m| (MatchOrigin::Bracket(round), m)));
                    }
                }
            }
        }
        out
    }

    /// Total number of matches across all phases.
    pub fn match_count(&self) -> usize {
        let pools: usize = self.pools.iter().map(|p| p.matches.len()).sum();
        let bracket = self.elimination.as_ref().map_or(0, |b| {
            b.quarterfinals.len()
                + b.semifinals.len()
                + usize::from(b.final_match.is_some())
                + usize::from(b.third_place.is_some())
        });
        self.round_robin.len() + pools + bracket
    }
}

// ---------------------------------------------------------------------------
// Generator response parsing
// ---------------------------------------------------------------------------

/// Parse the raw text returned by the generator.
///
/// Tolerates a surrounding Markdown code fence. The result must be a JSON
/// object carrying a non-blank `type_tournoi`; the object is returned as-is
/// so it can be stored verbatim.
pub fn parse_planning_response(text: &str) -> Result<serde_json::Value, DocumentError> {
    let body = strip_code_fence(text);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(DocumentError::InvalidJson)?;

    let object = value.as_object().ok_or(DocumentError::NotAnObject)?;
    if !object.contains_key("type_tournoi") {
        return Err(DocumentError::MissingTournamentType);
    }

    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) after the opening backticks.
    let body = trimmed[open + 3..]
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    match body.rfind("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a generator timestamp. Offsets are dropped: schedules are local to
/// the venue.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

fn timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {text:?}")))
}
