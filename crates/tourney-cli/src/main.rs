mod config;
mod planning_cmds;
mod serve_cmd;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use tourney_core::planning::Planner;
use tourney_core::store::PgStore;
use tourney_db::pool;

use config::TourneyConfig;

#[derive(Parser)]
#[command(name = "tourney", about = "Tournament planning generator and store")]
struct Cli {
    /// Database URL (overrides TOURNEY_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Planning generator command (overrides TOURNEY_GENERATOR_COMMAND env var)
    #[arg(long, global = true)]
    generator_command: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a tourney config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/tourney")]
        db_url: String,
        /// Command that reads a prompt on stdin and prints a planning document
        #[arg(long)]
        generator_command: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the tourney database (requires config file or env vars)
    DbInit,
    /// Generate a planning for a tournament, replacing its current one
    Generate {
        /// Tournament ID
        tournament_id: String,
    },
    /// Store a planning document read from a file (no generator involved)
    Import {
        /// Tournament ID
        tournament_id: String,
        /// Path to the JSON planning document
        file: String,
    },
    /// Replace a planning with a freshly generated one
    Regenerate {
        /// Planning ID
        planning_id: String,
    },
    /// Show the status of a planning
    Status {
        /// Planning ID
        planning_id: String,
    },
    /// Change the status of a planning
    SetStatus {
        /// Planning ID
        planning_id: String,
        /// generated, validated, published or archived
        status: String,
    },
    /// Show a planning with its pools and matches
    Show {
        /// Planning ID
        planning_id: String,
        /// Print the planning as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the planning of a tournament
    ShowTournament {
        /// Tournament ID
        tournament_id: String,
        /// Print the planning as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a planning with its matches and pools
    Delete {
        /// Planning ID
        planning_id: String,
    },
    /// Start the JSON API server
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

/// Execute the `tourney init` command: write config file.
fn cmd_init(db_url: &str, generator_command: Option<&str>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let generator = generator_command.map(|command| config::GeneratorSection {
        command: command.to_owned(),
        args: Vec::new(),
        timeout_secs: tourney_core::generator::CommandGenerator::DEFAULT_TIMEOUT.as_secs(),
    });
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generator,
    };

    config::save_config_to(&cfg, &path)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if let Some(ref g) = cfg.generator {
        println!("  generator.command = {}", g.command);
    }
    println!();
    println!("Next: run `tourney db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `tourney db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = TourneyConfig::resolve(cli_db_url, None)?;

    println!("Initializing tourney database...");

    match pool::ensure_database_exists(&resolved.db_config).await? {
        pool::DatabaseSetup::Created => println!("  database created"),
        pool::DatabaseSetup::AlreadyPresent => println!("  database already exists"),
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        pool::store_summary(&db_pool).await
    }
    .await;
    db_pool.close().await;
    let summary = result?;

    println!("  store: {summary}");
    println!("tourney db-init complete.");
    Ok(())
}

/// Build a planner over PostgreSQL, with the configured generator if any.
fn build_planner(store: PgStore, resolved: &TourneyConfig) -> Planner {
    let planner = Planner::new(Arc::new(store));
    match resolved.command_generator() {
        Some(generator) => planner.with_generator(Arc::new(generator)),
        None => planner,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            generator_command,
            force,
        } => {
            cmd_init(&db_url, generator_command.as_deref(), force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = TourneyConfig::resolve(
                cli.database_url.as_deref(),
                cli.generator_command.as_deref(),
            )?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let planner = build_planner(PgStore::new(db_pool.clone()), &resolved);
            let result = serve_cmd::run_serve(planner, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        command => {
            let resolved = TourneyConfig::resolve(
                cli.database_url.as_deref(),
                cli.generator_command.as_deref(),
            )?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let planner = build_planner(PgStore::new(db_pool.clone()), &resolved);
            let result = planning_cmds::run_planning_command(command, &planner).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
