//! Runtime configuration loaded from the environment.

use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::tables::ScoringTables;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:smokefree.db?mode=rwc";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Optional JSON file overriding the default scoring tables.
    pub tables_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DB_PATH.to_string(),
            tables_path: None,
        }
    }
}

impl AppConfig {
    /// Read `SMOKEFREE_PORT`, `SMOKEFREE_DATABASE_URL` and
    /// `SMOKEFREE_TABLES_PATH`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = lookup("SMOKEFREE_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let database_url = lookup("SMOKEFREE_DATABASE_URL").unwrap_or(defaults.database_url);

        let tables_path = lookup("SMOKEFREE_TABLES_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            port,
            database_url,
            tables_path,
        }
    }

    /// Load the scoring tables, from the configured file if any.
    pub fn load_tables(&self) -> anyhow::Result<ScoringTables> {
        match &self.tables_path {
            Some(path) => {
                let tables = ScoringTables::from_json_file(path)?;
                info!(path = %path.display(), "Loaded scoring tables override");
                Ok(tables)
            }
            None => Ok(ScoringTables::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[]));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, DEFAULT_DB_PATH);
        assert!(config.tables_path.is_none());
        assert_eq!(config.load_tables().unwrap(), ScoringTables::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SMOKEFREE_PORT", "8080"),
            ("SMOKEFREE_DATABASE_URL", "sqlite::memory:"),
            ("SMOKEFREE_TABLES_PATH", "/etc/smokefree/tables.json"),
        ]));

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(
            config.tables_path,
            Some(PathBuf::from("/etc/smokefree/tables.json"))
        );
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = AppConfig::from_lookup(lookup(&[("SMOKEFREE_PORT", "not-a-port")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_load_tables_from_file() {
        let path = std::env::temp_dir().join(format!(
            "smokefree-tables-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "successCeiling": 90 }"#).unwrap();

        let config = AppConfig {
            tables_path: Some(path.clone()),
            ..AppConfig::default()
        };
        let tables = config.load_tables().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(tables.success_ceiling, 90);
        assert_eq!(tables.success_floor, 5);
    }

    #[test]
    fn test_load_tables_missing_file_is_error() {
        let config = AppConfig {
            tables_path: Some(PathBuf::from("/nonexistent/smokefree/tables.json")),
            ..AppConfig::default()
        };
        assert!(config.load_tables().is_err());
    }
}
