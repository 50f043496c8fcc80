//! Prompt sent to the planning generator.
//!
//! Pure string assembly: tournament facts, the roster, and the JSON contract
//! the reply must follow.

use std::fmt::Write as _;

use tourney_db::models::{Team, Tournament};

use super::resolver::PLACEHOLDER_PREFIXES;

/// Shape of the expected reply, with the generator-facing field names.
const OUTPUT_CONTRACT: &str = r#"## Format de réponse

Réponds uniquement avec un objet JSON, sans texte autour :

```json
{
  "type_tournoi": "round_robin | poules | poules_elimination | elimination_directe",
  "matchs_round_robin": [
    {
      "match_id": "rr_1",
      "equipe_a": "nom exact de l'équipe",
      "equipe_b": "nom exact de l'équipe",
      "terrain": 1,
      "debut_horaire": "YYYY-MM-DDTHH:MM:SS",
      "fin_horaire": "YYYY-MM-DDTHH:MM:SS",
      "journee": 1
    }
  ],
  "poules": [
    {
      "poule_id": "P1",
      "nom_poule": "Poule 1",
      "equipes": ["..."],
      "matchs": [ { "match_id": "p1_1", "...": "même format que ci-dessus, sans journee" } ]
    }
  ],
  "phase_elimination_apres_poules": {
    "quarts": [],
    "demi_finales": [],
    "finale": null,
    "match_troisieme_place": null
  },
  "commentaires": "remarques libres"
}
```
"#;

/// Build the generation prompt for a tournament and its roster.
pub fn build_planning_prompt(tournament: &Tournament, teams: &[Team]) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str("# Planification de tournoi\n\n");
    prompt.push_str(
        "Tu planifies les matchs d'un tournoi. Chaque équipe ne joue qu'un match à la fois, \
         chaque terrain n'accueille qu'un match à la fois, et une pause sépare deux matchs \
         consécutifs sur un même terrain.\n\n",
    );

    prompt.push_str("## Tournoi\n\n");
    let _ = writeln!(prompt, "- Nom : {}", tournament.name);
    let _ = writeln!(
        prompt,
        "- Type : {}",
        tournament.tournament_type.as_deref().unwrap_or("round_robin")
    );
    let _ = writeln!(prompt, "- Terrains disponibles : {}", tournament.courts_available);
    let _ = writeln!(
        prompt,
        "- Début : {} à {}",
        tournament.start_date.format("%Y-%m-%d"),
        tournament.start_time.format("%H:%M")
    );
    let _ = writeln!(
        prompt,
        "- Durée d'un match : {} minutes",
        tournament.match_duration_minutes
    );
    let _ = writeln!(
        prompt,
        "- Pause entre deux matchs : {} minutes",
        tournament.break_duration_minutes
    );

    let _ = writeln!(prompt, "\n## Équipes ({})\n", teams.len());
    for team in teams {
        let _ = writeln!(prompt, "- {}", team.name);
    }
    prompt.push('\n');

    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');

    prompt.push_str(
        "Utilise les noms d'équipes exactement comme listés. Pour un participant qui dépend \
         d'un résultat, utilise un nom commençant par ",
    );
    let prefixes: Vec<String> = PLACEHOLDER_PREFIXES
        .iter()
        .map(|p| format!("`{p}`"))
        .collect();
    prompt.push_str(&prefixes.join(", "));
    prompt.push_str(" (par exemple `winner_qf_1`, `1er_P1`).\n");

    prompt
}
