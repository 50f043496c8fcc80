//! Readiness checks run before a tournament is sent to the generator.

use thiserror::Error;

use tourney_db::models::{Team, Tournament};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TournamentValidationError {
    #[error("at least 2 teams are required, found {0}")]
    NotEnoughTeams(usize),

    #[error("{count} teams registered but the tournament allows at most {max}")]
    TooManyTeams { count: usize, max: i32 },

    #[error("at least one court must be available")]
    NoCourts,

    #[error("tournament type is not set")]
    MissingType,
}

/// Check that a tournament can be planned with its current roster.
pub fn validate_tournament(
    tournament: &Tournament,
    teams: &[Team],
) -> Result<(), TournamentValidationError> {
    if teams.len() < 2 {
        return Err(TournamentValidationError::NotEnoughTeams(teams.len()));
    }
    let over_capacity = usize::try_from(tournament.max_teams).map_or(true, |max| teams.len() > max);
    if over_capacity {
        return Err(TournamentValidationError::TooManyTeams {
            count: teams.len(),
            max: tournament.max_teams,
        });
    }
    if tournament.courts_available <= 0 {
        return Err(TournamentValidationError::NoCourts);
    }
    let has_type = tournament
        .tournament_type
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_type {
        return Err(TournamentValidationError::MissingType);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    fn tournament() -> Tournament {
        Tournament {
            id: Uuid::new_v4(),
            name: "Open d'été".into(),
            tournament_type: Some("round_robin".into()),
            max_teams: 4,
            courts_available: 2,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            match_duration_minutes: 15,
            break_duration_minutes: 5,
            status: "draft".into(),
            created_at: Utc::now(),
        }
    }

    fn teams(n: usize) -> Vec<Team> {
        (0..n)
            .map(|i| Team {
                id: Uuid::new_v4(),
                tournament_id: Uuid::nil(),
                name: format!("Équipe {i}"),
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn ready_tournament_passes() {
        assert_eq!(validate_tournament(&tournament(), &teams(4)), Ok(()));
    }

    #[test]
    fn needs_two_teams() {
        assert_eq!(
            validate_tournament(&tournament(), &teams(1)),
            Err(TournamentValidationError::NotEnoughTeams(1))
        );
    }

    #[test]
    fn respects_capacity() {
        assert_eq!(
            validate_tournament(&tournament(), &teams(5)),
            Err(TournamentValidationError::TooManyTeams { count: 5, max: 4 })
        );

        let mut negative = tournament();
        negative.max_teams = -1;
        assert!(matches!(
            validate_tournament(&negative, &teams(2)),
            Err(TournamentValidationError::TooManyTeams { .. })
        ));
    }

    #[test]
    fn needs_a_court() {
        let mut t = tournament();
        t.courts_available = 0;
        assert_eq!(
            validate_tournament(&t, &teams(2)),
            Err(TournamentValidationError::NoCourts)
        );
    }

    #[test]
    fn needs_a_type() {
        let mut t = tournament();
        t.tournament_type = None;
        assert_eq!(
            validate_tournament(&t, &teams(2)),
            Err(TournamentValidationError::MissingType)
        );
        t.tournament_type = Some(" ".into());
        assert_eq!(
            validate_tournament(&t, &teams(2)),
            Err(TournamentValidationError::MissingType)
        );
    }
}
