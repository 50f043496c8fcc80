use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanningStatus {
    Generated,
    Validated,
    Published,
    Archived,
}

impl fmt::Display for PlanningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Generated => "generated",
            Self::Validated => "validated",
            Self::Published => "published",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanningStatus {
    type Err = PlanningStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "validated" => Ok(Self::Validated),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(PlanningStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanningStatus`] string.
#[derive(Debug, Clone)]
pub struct PlanningStatusParseError(pub String);

impl fmt::Display for PlanningStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid planning status: {:?}", self.0)
    }
}

impl std::error::Error for PlanningStatusParseError {}

// ---------------------------------------------------------------------------

/// Tournament stage a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    RoundRobin,
    Poules,
    Elimination,
    Finale,
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RoundRobin => "round_robin",
            Self::Poules => "poules",
            Self::Elimination => "elimination",
            Self::Finale => "finale",
        };
        f.write_str(s)
    }
}

impl FromStr for MatchPhase {
    type Err = MatchPhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Self::RoundRobin),
            "poules" => Ok(Self::Poules),
            "elimination" => Ok(Self::Elimination),
            "finale" => Ok(Self::Finale),
            other => Err(MatchPhaseParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MatchPhase`] string.
#[derive(Debug, Clone)]
pub struct MatchPhaseParseError(pub String);

impl fmt::Display for MatchPhaseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid match phase: {:?}", self.0)
    }
}

impl std::error::Error for MatchPhaseParseError {}

// ---------------------------------------------------------------------------

/// Lifecycle status of a match. Matches are created `scheduled`; the other
/// transitions belong to whatever runs the tournament day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for MatchStatus {
    type Err = MatchStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(MatchStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MatchStatus`] string.
#[derive(Debug, Clone)]
pub struct MatchStatusParseError(pub String);

impl fmt::Display for MatchStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid match status: {:?}", self.0)
    }
}

impl std::error::Error for MatchStatusParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A tournament as registered by the organizer. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub tournament_type: Option<String>,
    pub max_teams: i32,
    pub courts_available: i32,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub match_duration_minutes: i32,
    pub break_duration_minutes: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A team registered in a tournament. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The root record of one generated schedule for a tournament.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TournamentPlanning {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub tournament_type: String,
    pub status: PlanningStatus,
    /// The generator's document, kept verbatim for traceability.
    pub planning_data: serde_json::Value,
    pub total_matches: i32,
    pub ai_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A match extracted from a planning, with team names resolved to ids where
/// possible.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResolvedMatch {
    pub id: Uuid,
    pub planning_id: Uuid,
    pub external_match_id: String,
    pub team_a: String,
    pub team_b: String,
    pub resolved_team_a_id: Option<Uuid>,
    pub resolved_team_b_id: Option<Uuid>,
    pub court: i32,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub phase: MatchPhase,
    pub pool_id: Option<String>,
    pub matchday: Option<i32>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

/// Summary of one pool of a planning.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PoolSummary {
    pub id: Uuid,
    pub planning_id: Uuid,
    pub external_pool_id: String,
    pub name: String,
    pub teams: Vec<String>,
    pub team_count: i32,
    pub match_count: i32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_status_display_roundtrip() {
        let variants = [
            PlanningStatus::Generated,
            PlanningStatus::Validated,
            PlanningStatus::Published,
            PlanningStatus::Archived,
        ];
        for v in &variants {
            let parsed: PlanningStatus = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn planning_status_invalid() {
        assert!("drafted".parse::<PlanningStatus>().is_err());
    }

    #[test]
    fn match_phase_wire_names() {
        assert_eq!(MatchPhase::RoundRobin.to_string(), "round_robin");
        assert_eq!(MatchPhase::Finale.to_string(), "finale");
        assert_eq!("poules".parse::<MatchPhase>().unwrap(), MatchPhase::Poules);
        assert_eq!(
            serde_json::to_value(MatchPhase::Elimination).unwrap(),
            serde_json::json!("elimination")
        );
    }

    #[test]
    fn match_phase_invalid() {
        let err = "groups".parse::<MatchPhase>().unwrap_err();
        assert_eq!(err.to_string(), "invalid match phase: \"groups\"");
    }

    #[test]
    fn match_status_display_roundtrip() {
        let variants = [
            MatchStatus::Scheduled,
            MatchStatus::InProgress,
            MatchStatus::Completed,
            MatchStatus::Cancelled,
        ];
        for v in &variants {
            let parsed: MatchStatus = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }
}
