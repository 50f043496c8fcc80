//! Configuration file management for tourney.
//!
//! Provides a TOML config file at `~/.config/tourney/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tourney_core::generator::CommandGenerator;
use tourney_db::config::DbConfig;

/// Environment variable naming the generator command.
pub const GENERATOR_ENV_VAR: &str = "TOURNEY_GENERATOR_COMMAND";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

/// External command that produces planning documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSection {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    CommandGenerator::DEFAULT_TIMEOUT.as_secs()
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the tourney config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/tourney` or `~/.config/tourney`,
/// also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("tourney");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tourney")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since the URL may carry a password.
pub fn save_config_to(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TourneyConfig {
    pub db_config: DbConfig,
    /// `None` when no generator is configured anywhere.
    pub generator: Option<GeneratorSection>,
}

impl TourneyConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `TOURNEY_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Generator command: `cli_generator` > `TOURNEY_GENERATOR_COMMAND` > `generator.command` > none.
    ///   Arguments and timeout always come from the config file when present.
    pub fn resolve(cli_db_url: Option<&str>, cli_generator: Option<&str>) -> Result<Self> {
        let path = config_path();
        let file_config = if path.exists() {
            Some(load_config_from(&path)?)
        } else {
            None
        };
        Ok(Self::resolve_with(cli_db_url, cli_generator, file_config))
    }

    fn resolve_with(
        cli_db_url: Option<&str>,
        cli_generator: Option<&str>,
        file_config: Option<ConfigFile>,
    ) -> Self {
        let db_url = if let Some(url) = cli_db_url {
            url.to_owned()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_owned()
        };

        let from_file = file_config.and_then(|cfg| cfg.generator);
        let override_command = cli_generator
            .map(str::to_owned)
            .or_else(|| std::env::var(GENERATOR_ENV_VAR).ok())
            .filter(|c| !c.trim().is_empty());
        let generator = match (override_command, from_file) {
            (Some(command), Some(section)) => Some(GeneratorSection { command, ..section }),
            (Some(command), None) => Some(GeneratorSection {
                command,
                args: Vec::new(),
                timeout_secs: default_timeout_secs(),
            }),
            (None, section) => section,
        };

        Self {
            db_config: DbConfig::new(db_url),
            generator,
        }
    }

    /// Build the configured generator, if any.
    pub fn command_generator(&self) -> Option<CommandGenerator> {
        self.generator.as_ref().map(|g| {
            CommandGenerator::new(g.command.clone(), g.args.clone())
                .with_timeout(Duration::from_secs(g.timeout_secs.max(1)))
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
