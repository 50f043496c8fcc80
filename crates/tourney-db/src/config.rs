use std::env;

/// Database configuration.
///
/// Reads from the `TOURNEY_DATABASE_URL` environment variable, falling back to
/// `postgresql://localhost:5432/tourney` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/tourney";

    /// Name of the environment variable holding the connection URL.
    pub const ENV_VAR: &str = "TOURNEY_DATABASE_URL";

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(base, _)| base);
        without_query
            .rsplit_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, name)| name)
            .filter(|s| !s.is_empty())
    }

    /// URL of the `postgres` maintenance database on the same server, used to
    /// issue `CREATE DATABASE` for a missing target.
    pub fn maintenance_url(&self) -> String {
        match self.database_name() {
            Some(name) => {
                let end = self
                    .database_url
                    .find('?')
                    .unwrap_or(self.database_url.len());
                let start = end - name.len();
                format!(
                    "{}postgres{}",
                    &self.database_url[..start],
                    &self.database_url[end..]
                )
            }
            None => format!("{}/postgres", self.database_url.trim_end_matches('/')),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
