//! CLI handlers for the planning subcommands.
//!
//! Implements:
//! - `tourney generate <tournament-id>`         -- generate and store a planning
//! - `tourney import <tournament-id> <file>`    -- store a planning document from disk
//! - `tourney regenerate <planning-id>`         -- replace a planning with a new one
//! - `tourney status <planning-id>`             -- show planning status
//! - `tourney set-status <planning-id> <status>`
//! - `tourney show <planning-id>`               -- show planning, pools and matches
//! - `tourney show-tournament <tournament-id>`
//! - `tourney delete <planning-id>`

use std::fmt::Write as _;

use anyhow::{Context, Result};
use uuid::Uuid;

use tourney_core::planning::{
    PlanningDetails, PlanningOutcome, Planner, is_placeholder, parse_planning_response,
};
use tourney_db::models::{PlanningStatus, ResolvedMatch};

use crate::Commands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a planning subcommand to the appropriate handler.
pub async fn run_planning_command(command: Commands, planner: &Planner) -> Result<()> {
    match command {
        Commands::Generate { tournament_id } => cmd_generate(planner, &tournament_id).await,
        Commands::Import {
            tournament_id,
            file,
        } => cmd_import(planner, &tournament_id, &file).await,
        Commands::Regenerate { planning_id } => cmd_regenerate(planner, &planning_id).await,
        Commands::Status { planning_id } => cmd_status(planner, &planning_id).await,
        Commands::SetStatus {
            planning_id,
            status,
        } => cmd_set_status(planner, &planning_id, &status).await,
        Commands::Show { planning_id, json } => {
            let id = parse_id(&planning_id, "planning")?;
            let details = planner.get_planning_details(id).await?;
            print_details(&details, json)
        }
        Commands::ShowTournament {
            tournament_id,
            json,
        } => {
            let id = parse_id(&tournament_id, "tournament")?;
            let details = planner.get_planning_details_for_tournament(id).await?;
            print_details(&details, json)
        }
        Commands::Delete { planning_id } => cmd_delete(planner, &planning_id).await,
        Commands::Init { .. } | Commands::DbInit | Commands::Serve { .. } => {
            anyhow::bail!("not a planning command")
        }
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid {what} ID: {raw:?}"))
}

// -----------------------------------------------------------------------
// Generation and import
// -----------------------------------------------------------------------

async fn cmd_generate(planner: &Planner, tournament_id: &str) -> Result<()> {
    let id = parse_id(tournament_id, "tournament")?;
    println!("Generating planning for tournament {id}...");
    let outcome = planner.generate_planning(id).await?;
    print!("{}", render_outcome("Planning generated.", &outcome));
    Ok(())
}

async fn cmd_import(planner: &Planner, tournament_id: &str, file_path: &str) -> Result<()> {
    let id = parse_id(tournament_id, "tournament")?;
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read planning file: {file_path}"))?;
    let document = parse_planning_response(&content)
        .with_context(|| format!("failed to parse planning file: {file_path}"))?;

    let outcome = planner.replace_planning(id, &document).await?;
    print!("{}", render_outcome("Planning imported.", &outcome));
    Ok(())
}

async fn cmd_regenerate(planner: &Planner, planning_id: &str) -> Result<()> {
    let id = parse_id(planning_id, "planning")?;
    let outcome = planner.regenerate_planning(id).await?;
    print!("{}", render_outcome("Planning regenerated.", &outcome));
    Ok(())
}

fn render_outcome(headline: &str, outcome: &PlanningOutcome) -> String {
    let planning = &outcome.planning;
    let mut out = String::new();
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Planning ID:   {}", planning.id);
    let _ = writeln!(out, "  Tournament ID: {}", planning.tournament_id);
    let _ = writeln!(out, "  Type:          {}", planning.tournament_type);
    let _ = writeln!(out, "  Status:        {}", planning.status);
    let _ = writeln!(out, "  Matches:       {}", planning.total_matches);
    let _ = writeln!(
        out,
        "  Stored:        {} matches, {} pools",
        outcome.matches.len(),
        outcome.pools.len()
    );

    if !outcome.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for w in &outcome.warnings {
            let _ = writeln!(out, "  - {w}");
        }
    }
    out
}

// -----------------------------------------------------------------------
// Status
// -----------------------------------------------------------------------

async fn cmd_status(planner: &Planner, planning_id: &str) -> Result<()> {
    let id = parse_id(planning_id, "planning")?;
    let view = planner.planning_status(id).await?;

    println!("Planning {}", view.planning_id);
    println!("  Tournament ID: {}", view.tournament_id);
    println!("  Status:        {}", view.status);
    println!("  Matches:       {}", view.total_matches);
    println!("  Updated:       {}", view.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

async fn cmd_set_status(planner: &Planner, planning_id: &str, status: &str) -> Result<()> {
    let id = parse_id(planning_id, "planning")?;
    let status: PlanningStatus = status.parse()?;
    let planning = planner.update_planning_status(id, status).await?;
    println!("Planning {} is now {}.", planning.id, planning.status);
    Ok(())
}

// -----------------------------------------------------------------------
// Show
// -----------------------------------------------------------------------

fn print_details(details: &PlanningDetails, json: bool) -> Result<()> {
    if json {
        let text =
            serde_json::to_string_pretty(details).context("failed to serialize planning")?;
        println!("{text}");
    } else {
        print!("{}", render_details(details));
    }
    Ok(())
}

fn render_details(details: &PlanningDetails) -> String {
    let planning = &details.planning;
    let mut out = String::new();
    let _ = writeln!(out, "Planning: {}", planning.id);
    let _ = writeln!(out, "  Tournament ID: {}", planning.tournament_id);
    let _ = writeln!(out, "  Type:          {}", planning.tournament_type);
    let _ = writeln!(out, "  Status:        {}", planning.status);
    let _ = writeln!(out, "  Matches:       {}", planning.total_matches);
    if let Some(ref comments) = planning.ai_comments {
        let _ = writeln!(out, "  Comments:      {comments}");
    }

    if !details.pools.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Pools:");
        for pool in &details.pools {
            let _ = writeln!(
                out,
                "  {:<6} {:<16} {} teams, {} matches: {}",
                pool.external_pool_id,
                pool.name,
                pool.team_count,
                pool.match_count,
                pool.teams.join(", ")
            );
        }
    }

    let _ = writeln!(out);
    if details.matches.is_empty() {
        let _ = writeln!(out, "No matches.");
        return out;
    }
    let _ = writeln!(
        out,
        "  {:<10} {:<18} {:>5}  {:<16}  {:<5}  {:<20} {:<20}",
        "MATCH", "PHASE", "COURT", "START", "END", "TEAM A", "TEAM B"
    );
    let _ = writeln!(out, "  {}", "-".repeat(104));
    for m in &details.matches {
        let _ = writeln!(
            out,
            "  {:<10} {:<18} {:>5}  {:<16}  {:<5}  {:<20} {:<20}",
            m.external_match_id,
            m.phase.to_string(),
            m.court,
            m.starts_at.format("%Y-%m-%d %H:%M").to_string(),
            m.ends_at.format("%H:%M").to_string(),
            team_label(&m.team_a, m.resolved_team_a_id),
            team_label(&m.team_b, m.resolved_team_b_id),
        );
    }
    if details.matches.iter().any(has_unresolved_team) {
        let _ = writeln!(out);
        let _ = writeln!(out, "  * team not found in the tournament roster");
    }
    out
}

/// Unresolved real team names are starred; placeholders are printed as is.
fn team_label(name: &str, resolved: Option<Uuid>) -> String {
    if resolved.is_none() && !is_placeholder(name) {
        format!("{name} *")
    } else {
        name.to_owned()
    }
}

fn has_unresolved_team(m: &ResolvedMatch) -> bool {
    (m.resolved_team_a_id.is_none() && !is_placeholder(&m.team_a))
        || (m.resolved_team_b_id.is_none() && !is_placeholder(&m.team_b))
}

// -----------------------------------------------------------------------
// Delete
// -----------------------------------------------------------------------

async fn cmd_delete(planner: &Planner, planning_id: &str) -> Result<()> {
    let id = parse_id(planning_id, "planning")?;
    let report = planner.delete_planning(id).await?;
    if report.is_noop() {
        println!("Planning {id} does not exist; nothing deleted.");
    } else {
        println!(
            "Deleted planning {id} ({} matches, {} pools).",
            report.matches, report.pools
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
