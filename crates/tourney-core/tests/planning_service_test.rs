//! Planner tests against the in-memory store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use tourney_core::generator::PlanningGenerator;
use tourney_core::planning::{ExtractionWarning, PlanningError, Planner, Side, Stage};
use tourney_core::store::{MemoryStore, PlanningStore, StoreOp};
use tourney_db::models::{MatchPhase, MatchStatus, PlanningStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generator that replays canned replies and records the prompts it saw.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn replying(replies: impl IntoIterator<Item = Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::default(),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl PlanningGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no reply scripted")))
    }
}

fn draft(id: &str, a: &str, b: &str, start: &str, end: &str) -> Value {
    json!({
        "match_id": id,
        "equipe_a": a,
        "equipe_b": b,
        "terrain": 1,
        "debut_horaire": start,
        "fin_horaire": end
    })
}

fn round_robin_example() -> Value {
    json!({
        "type_tournoi": "round_robin",
        "matchs_round_robin": [{
            "match_id": "rr_1",
            "equipe_a": "A",
            "equipe_b": "B",
            "terrain": 1,
            "debut_horaire": "2024-06-15T09:00:00",
            "fin_horaire": "2024-06-15T09:15:00",
            "journee": 1
        }],
        "poules": [],
        "phase_elimination_apres_poules": null,
        "commentaires": "ok"
    })
}

/// 2 pools (3 + 1 matches) and a full bracket (2 qf + 2 sf + final + third
/// place).
fn pools_and_bracket() -> Value {
    json!({
        "type_tournoi": "poules_elimination",
        "matchs_round_robin": [],
        "poules": [
            {
                "poule_id": "P1",
                "nom_poule": "Poule 1",
                "equipes": ["A", "B", "C"],
                "matchs": [
                    draft("p1_1", "A", "B", "2024-06-15T09:00:00", "2024-06-15T09:15:00"),
                    draft("p1_2", "B", "C", "2024-06-15T09:20:00", "2024-06-15T09:35:00"),
                    draft("p1_3", "A", "C", "2024-06-15T09:40:00", "2024-06-15T09:55:00")
                ]
            },
            {
                "poule_id": "P2",
                "nom_poule": "Poule 2",
                "equipes": ["D", "E"],
                "matchs": [draft("p2_1", "D", "E", "2024-06-15T09:00:00", "2024-06-15T09:15:00")]
            }
        ],
        "phase_elimination_apres_poules": {
            "quarts": [
                draft("qf_1", "1er_P1", "2e_P2", "2024-06-15T11:00:00", "2024-06-15T11:15:00"),
                draft("qf_2", "1er_P2", "2e_P1", "2024-06-15T11:00:00", "2024-06-15T11:15:00")
            ],
            "demi_finales": [
                draft("sf_1", "winner_qf_1", "winner_qf_2", "2024-06-15T12:00:00", "2024-06-15T12:15:00"),
                draft("sf_2", "A", "Inconnue", "2024-06-15T12:00:00", "2024-06-15T12:15:00")
            ],
            "finale": draft("f_1", "winner_sf_1", "winner_sf_2", "2024-06-15T14:00:00", "2024-06-15T14:15:00"),
            "match_troisieme_place": draft("tp_1", "loser_sf_1", "loser_sf_2", "2024-06-15T13:00:00", "2024-06-15T13:15:00")
        },
        "rounds_elimination": [],
        "final_ranking": []
    })
}

struct Fixture {
    store: Arc<MemoryStore>,
    planner: Planner,
    tournament_id: Uuid,
    team_ids: Vec<Uuid>,
}

fn fixture(team_names: &[&str]) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let tournament = store.add_tournament("Tournoi Test", 8, 2);
    let team_ids = team_names
        .iter()
        .map(|name| store.add_team(tournament.id, name).id)
        .collect();
    let planner = Planner::new(store.clone());
    Fixture {
        store,
        planner,
        tournament_id: tournament.id,
        team_ids,
    }
}

// ---------------------------------------------------------------------------
// Saving
// ---------------------------------------------------------------------------

#[tokio::test]
async fn round_robin_example_is_saved_and_resolved() {
    let f = fixture(&["A", "B"]);

    let outcome = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap();

    assert_eq!(outcome.planning.tournament_id, f.tournament_id);
    assert_eq!(outcome.planning.tournament_type, "round_robin");
    assert_eq!(outcome.planning.status, PlanningStatus::Generated);
    assert_eq!(outcome.planning.total_matches, 1);
    assert_eq!(outcome.planning.ai_comments.as_deref(), Some("ok"));
    assert_eq!(outcome.planning.planning_data, round_robin_example());
    assert!(outcome.warnings.is_empty());
    assert!(outcome.pools.is_empty());

    assert_eq!(outcome.matches.len(), 1);
    let m = &outcome.matches[0];
    assert_eq!(m.planning_id, outcome.planning.id);
    assert_eq!(m.phase, MatchPhase::RoundRobin);
    assert_eq!(m.resolved_team_a_id, Some(f.team_ids[0]));
    assert_eq!(m.resolved_team_b_id, Some(f.team_ids[1]));
    assert_eq!(m.matchday, Some(1));
    assert_eq!(m.status, MatchStatus::Scheduled);

    assert_eq!(f.store.planning_count(), 1);
    assert_eq!(f.store.match_count(), 1);
}

#[tokio::test]
async fn stored_matches_equal_total_matches() {
    let f = fixture(&["A", "B", "C", "D", "E"]);

    let outcome = f
        .planner
        .save_planning(f.tournament_id, &pools_and_bracket())
        .await
        .unwrap();

    // 3 + 1 pool matches, 2 qf, 2 sf, final, third place
    assert_eq!(outcome.planning.total_matches, 10);
    assert_eq!(outcome.matches.len(), 10);
    assert_eq!(f.store.match_count(), 10);

    let finales = outcome
        .matches
        .iter()
        .filter(|m| m.phase == MatchPhase::Finale)
        .count();
    assert_eq!(finales, 1);

    assert_eq!(outcome.pools.len(), 2);
    assert_eq!(outcome.pools[0].team_count, 3);
    assert_eq!(outcome.pools[0].match_count, 3);
    assert_eq!(outcome.pools[1].match_count, 1);
}

#[tokio::test]
async fn placeholders_never_warn_but_unknown_names_do() {
    let f = fixture(&["A", "B", "C", "D", "E"]);

    let outcome = f
        .planner
        .save_planning(f.tournament_id, &pools_and_bracket())
        .await
        .unwrap();

    assert_eq!(
        outcome.warnings,
        [ExtractionWarning::UnresolvedTeam {
            match_id: "sf_2".into(),
            side: Side::B,
            name: "Inconnue".into(),
        }]
    );

    let sf_2 = outcome
        .matches
        .iter()
        .find(|m| m.external_match_id == "sf_2")
        .unwrap();
    assert_eq!(sf_2.resolved_team_a_id, Some(f.team_ids[0]));
    assert_eq!(sf_2.resolved_team_b_id, None);
}

#[tokio::test]
async fn tournament_without_teams_saves_unresolved_matches() {
    let f = fixture(&[]);

    let outcome = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].resolved_team_a_id, None);
    assert_eq!(outcome.warnings.len(), 2);
}

#[tokio::test]
async fn empty_pools_are_not_an_error() {
    let f = fixture(&["A", "B"]);

    let outcome = f
        .planner
        .save_planning(
            f.tournament_id,
            &json!({"type_tournoi": "poules", "poules": []}),
        )
        .await
        .unwrap();

    assert!(outcome.pools.is_empty());
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.planning.total_matches, 0);
    assert_eq!(f.store.pool_count(), 0);
}

#[tokio::test]
async fn invalid_document_writes_nothing() {
    let f = fixture(&["A", "B"]);

    for doc in [json!(["round_robin"]), json!({"poules": []}), json!({"type_tournoi": ""})] {
        let err = f
            .planner
            .save_planning(f.tournament_id, &doc)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidDocument(_)), "{err}");
        assert!(err.is_invalid_input());
    }
    assert_eq!(f.store.planning_count(), 0);
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn planning_insert_failure_attempts_nothing_else() {
    let f = fixture(&["A", "B"]);
    f.store.fail_on(StoreOp::InsertPlanning);
    // Would turn into a RollbackIncomplete if a rollback were attempted.
    f.store.fail_on(StoreOp::DeleteMatches);

    let err = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlanningError::Storage {
            stage: Stage::SavePlanning,
            ..
        }
    ));
    assert_eq!(f.store.planning_count(), 0);
}

#[tokio::test]
async fn match_failure_rolls_back_planning() {
    let f = fixture(&["A", "B"]);
    f.store.fail_on(StoreOp::InsertMatches);

    let err = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlanningError::Storage {
            stage: Stage::SaveMatches,
            ..
        }
    ));
    assert_eq!(f.store.planning_count(), 0);
    assert_eq!(f.store.match_count(), 0);
}

#[tokio::test]
async fn team_lookup_failure_rolls_back_planning() {
    let f = fixture(&["A", "B"]);
    f.store.fail_on(StoreOp::ListTeams);

    let err = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlanningError::Storage {
            stage: Stage::ResolveTeams,
            ..
        }
    ));
    assert_eq!(f.store.planning_count(), 0);
}

#[tokio::test]
async fn pool_failure_rolls_back_matches_and_planning() {
    let f = fixture(&["A", "B", "C", "D", "E"]);
    f.store.fail_on(StoreOp::InsertPools);

    let err = f
        .planner
        .save_planning(f.tournament_id, &pools_and_bracket())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlanningError::Storage {
            stage: Stage::SavePools,
            ..
        }
    ));
    assert_eq!(f.store.planning_count(), 0);
    assert_eq!(f.store.match_count(), 0);
    assert_eq!(f.store.pool_count(), 0);
}

#[tokio::test]
async fn failed_rollback_is_reported() {
    let f = fixture(&["A", "B", "C", "D", "E"]);
    f.store.fail_on(StoreOp::InsertPools);
    f.store.fail_on(StoreOp::DeleteMatches);

    let err = f
        .planner
        .save_planning(f.tournament_id, &pools_and_bracket())
        .await
        .unwrap_err();

    let PlanningError::RollbackIncomplete {
        stage, planning_id, ..
    } = &err
    else {
        panic!("expected RollbackIncomplete, got {err:?}");
    };
    assert_eq!(*stage, Stage::SavePools);
    // Matches could not be removed, so neither could the planning.
    assert_eq!(f.store.match_count(), 10);
    assert_eq!(f.store.planning_count(), 1);

    f.store.heal(StoreOp::DeleteMatches);
    let report = f.planner.delete_planning(*planning_id).await.unwrap();
    assert_eq!(report.matches, 10);
    assert_eq!(report.plannings, 1);
    assert_eq!(f.store.planning_count(), 0);
}

#[tokio::test]
async fn second_save_for_same_tournament_is_fenced() {
    let f = fixture(&["A", "B"]);
    let first = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap();

    let err = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlanningError::Storage {
            stage: Stage::SavePlanning,
            ..
        }
    ));
    // The loser never touched the winner's rows.
    let kept = f.planner.get_planning_details(first.planning.id).await.unwrap();
    assert_eq!(kept.matches.len(), 1);
}

// ---------------------------------------------------------------------------
// Delete, replace, regenerate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_twice_is_a_noop() {
    let f = fixture(&["A", "B", "C", "D", "E"]);
    let outcome = f
        .planner
        .save_planning(f.tournament_id, &pools_and_bracket())
        .await
        .unwrap();

    let first = f.planner.delete_planning(outcome.planning.id).await.unwrap();
    assert_eq!(first.plannings, 1);
    assert_eq!(first.matches, 10);
    assert_eq!(first.pools, 2);

    let second = f.planner.delete_planning(outcome.planning.id).await.unwrap();
    assert!(second.is_noop());

    let missing = f.planner.delete_planning(Uuid::new_v4()).await.unwrap();
    assert!(missing.is_noop());
}

#[tokio::test]
async fn replace_planning_swaps_the_tournament_planning() {
    let f = fixture(&["A", "B"]);
    let p1 = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap();

    let p2 = f
        .planner
        .replace_planning(f.tournament_id, &json!({"type_tournoi": "round_robin"}))
        .await
        .unwrap();

    assert_ne!(p1.planning.id, p2.planning.id);
    assert_eq!(f.store.planning_count(), 1);
    assert_eq!(f.store.match_count(), 0);
}

#[tokio::test]
async fn replace_with_invalid_document_keeps_the_old_planning() {
    let f = fixture(&["A", "B"]);
    let p1 = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap();

    let err = f
        .planner
        .replace_planning(f.tournament_id, &json!({"poules": []}))
        .await
        .unwrap_err();

    assert!(err.is_invalid_input());
    let current = f
        .planner
        .get_planning_for_tournament(f.tournament_id)
        .await
        .unwrap();
    assert_eq!(current.id, p1.planning.id);
}

#[tokio::test]
async fn regeneration_replaces_p1_with_p2() {
    let f = fixture(&["A", "B"]);
    let generator = ScriptedGenerator::replying([
        Ok(round_robin_example().to_string()),
        Ok(format!("```json\n{}\n```", round_robin_example())),
    ]);
    let planner = f.planner.clone().with_generator(generator.clone());

    let p1 = planner.generate_planning(f.tournament_id).await.unwrap();
    let p2 = planner.regenerate_planning(p1.planning.id).await.unwrap();

    assert_ne!(p1.planning.id, p2.planning.id);
    assert_eq!(p2.planning.tournament_id, f.tournament_id);

    let current = planner
        .get_planning_for_tournament(f.tournament_id)
        .await
        .unwrap();
    assert_eq!(current.id, p2.planning.id);

    let err = planner.get_planning(p1.planning.id).await.unwrap_err();
    assert!(matches!(err, PlanningError::PlanningNotFound(_)));
    assert_eq!(f.store.planning_count(), 1);
    assert_eq!(f.store.match_count(), 1);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn regenerate_unknown_planning_has_no_side_effects() {
    let f = fixture(&["A", "B"]);
    let generator = ScriptedGenerator::replying([]);
    let planner = f.planner.clone().with_generator(generator.clone());

    let err = planner.regenerate_planning(Uuid::new_v4()).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn regeneration_failure_keeps_old_planning() {
    let f = fixture(&["A", "B"]);
    let generator = ScriptedGenerator::replying([
        Ok(round_robin_example().to_string()),
        Err(anyhow!("upstream unavailable")),
    ]);
    let planner = f.planner.clone().with_generator(generator);

    let p1 = planner.generate_planning(f.tournament_id).await.unwrap();
    let err = planner.regenerate_planning(p1.planning.id).await.unwrap_err();

    assert!(matches!(err, PlanningError::Generation(_)));
    assert_eq!(planner.get_planning(p1.planning.id).await.unwrap().id, p1.planning.id);
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generation_prompts_with_the_roster() {
    let f = fixture(&["Équipe 1", "Équipe 2"]);
    let generator = ScriptedGenerator::replying([Ok(json!({"type_tournoi": "round_robin"}).to_string())]);
    let planner = f.planner.clone().with_generator(generator.clone());

    planner.generate_planning(f.tournament_id).await.unwrap();

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("Tournoi Test"));
    assert!(prompts[0].contains("Équipe 1"));
    assert!(prompts[0].contains("Équipe 2"));
}

#[tokio::test]
async fn generation_of_unknown_tournament_is_not_found() {
    let f = fixture(&["A", "B"]);
    let generator = ScriptedGenerator::replying([]);
    let planner = f.planner.clone().with_generator(generator.clone());

    let err = planner.generate_planning(Uuid::new_v4()).await.unwrap_err();

    assert!(matches!(err, PlanningError::TournamentNotFound(_)));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn unready_tournament_is_never_sent_to_the_generator() {
    let f = fixture(&["Seule"]);
    let generator = ScriptedGenerator::replying([]);
    let planner = f.planner.clone().with_generator(generator.clone());

    let err = planner.generate_planning(f.tournament_id).await.unwrap_err();

    assert!(matches!(err, PlanningError::TournamentNotReady(_)));
    assert_eq!(generator.calls(), 0);
    assert_eq!(f.store.planning_count(), 0);
}

#[tokio::test]
async fn unparsable_reply_writes_nothing() {
    let f = fixture(&["A", "B"]);
    let generator = ScriptedGenerator::replying([Ok("Voici votre planning !".into())]);
    let planner = f.planner.clone().with_generator(generator);

    let err = planner.generate_planning(f.tournament_id).await.unwrap_err();

    assert!(matches!(err, PlanningError::InvalidDocument(_)));
    assert_eq!(f.store.planning_count(), 0);
}

#[tokio::test]
async fn generation_without_generator_fails() {
    let f = fixture(&["A", "B"]);

    let err = f.planner.generate_planning(f.tournament_id).await.unwrap_err();

    assert!(matches!(err, PlanningError::Generation(_)));
}

// ---------------------------------------------------------------------------
// Lookups and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn details_list_matches_by_start_time() {
    let f = fixture(&["A", "B", "C", "D", "E"]);
    let outcome = f
        .planner
        .save_planning(f.tournament_id, &pools_and_bracket())
        .await
        .unwrap();

    let details = f
        .planner
        .get_planning_details(outcome.planning.id)
        .await
        .unwrap();

    assert_eq!(details.matches.len(), 10);
    assert!(
        details
            .matches
            .windows(2)
            .all(|w| w[0].starts_at <= w[1].starts_at)
    );
    let pool_ids: Vec<&str> = details
        .pools
        .iter()
        .map(|p| p.external_pool_id.as_str())
        .collect();
    assert_eq!(pool_ids, ["P1", "P2"]);

    let by_tournament = f
        .planner
        .get_planning_details_for_tournament(f.tournament_id)
        .await
        .unwrap();
    assert_eq!(by_tournament.planning.id, outcome.planning.id);
}

#[tokio::test]
async fn status_can_be_read_and_updated() {
    let f = fixture(&["A", "B"]);
    let outcome = f
        .planner
        .save_planning(f.tournament_id, &round_robin_example())
        .await
        .unwrap();

    let status = f.planner.planning_status(outcome.planning.id).await.unwrap();
    assert_eq!(status.status, PlanningStatus::Generated);
    assert_eq!(status.total_matches, 1);

    let updated = f
        .planner
        .update_planning_status(outcome.planning.id, PlanningStatus::Published)
        .await
        .unwrap();
    assert_eq!(updated.status, PlanningStatus::Published);
    assert!(updated.updated_at >= outcome.planning.updated_at);

    let err = f
        .planner
        .update_planning_status(Uuid::new_v4(), PlanningStatus::Archived)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn lookups_distinguish_missing_from_broken() {
    let f = fixture(&["A", "B"]);

    let missing = f.planner.get_planning(Uuid::new_v4()).await.unwrap_err();
    assert!(missing.is_not_found());

    let none = f
        .planner
        .get_planning_for_tournament(f.tournament_id)
        .await
        .unwrap_err();
    assert!(matches!(none, PlanningError::NoPlanningForTournament(_)));

    f.store.fail_on(StoreOp::GetPlanning);
    let broken = f.planner.get_planning(Uuid::new_v4()).await.unwrap_err();
    assert!(!broken.is_not_found());
    assert!(matches!(
        broken,
        PlanningError::Storage {
            stage: Stage::Lookup,
            ..
        }
    ));
}

#[tokio::test]
async fn store_is_usable_as_trait_object() {
    let f = fixture(&["A", "B"]);
    let teams = f.planner.store().list_teams(f.tournament_id).await.unwrap();
    assert_eq!(teams.len(), 2);
}
