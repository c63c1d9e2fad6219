//! Service configuration loading.
//!
//! Configuration comes from an optional `rollup.toml` file with every field
//! overridable through a `ROLLUP_*` environment variable (environment wins).
//! A missing file yields defaults; a malformed file is an error. The
//! personal access token is read only from `ROLLUP_PAT`, never from a file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Default name of the remote field holding an item's release tag.
const DEFAULT_RELEASE_FIELD: &str = "Custom.Release";
const DEFAULT_STRATEGY: &str = "hierarchy-only";
const DEFAULT_MAX_DEPTH: u32 = 10;
const DEFAULT_PORT: u16 = 7010;

/// Root configuration for the rollup service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RollupConfig {
    /// Base URL of the remote tracking organization.
    pub org_url: Option<String>,
    /// Project name within the organization.
    pub project: Option<String>,
    /// Team identifier, needed only for template operations.
    pub team_id: Option<String>,
    /// Remote API version string.
    pub api_version: Option<String>,
    /// Remote field name holding the release tag (default: "Custom.Release").
    pub release_field: Option<String>,
    /// Release applied when a request names none.
    pub default_release: Option<String>,
    /// Area path applied when a request names none.
    pub default_area_path: Option<String>,
    /// Relationship strategy applied when a request names none.
    pub default_strategy: Option<String>,
    /// Hierarchy recursion cap (default: 10).
    pub max_depth: Option<u32>,
    /// Port the HTTP server binds (default: 7010).
    pub port: Option<u16>,
}

impl RollupConfig {
    /// Load configuration from a TOML file, without environment overrides.
    ///
    /// Returns defaults if the file doesn't exist; errors if it exists but
    /// is malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: RollupConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from `rollup.toml` (or an explicit path) and apply
    /// `ROLLUP_*` environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Path::new("rollup.toml");
        let mut config = Self::from_file(path.unwrap_or(default_path))?;
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        for (var, slot) in [
            ("ROLLUP_ORG_URL", &mut self.org_url),
            ("ROLLUP_PROJECT", &mut self.project),
            ("ROLLUP_TEAM_ID", &mut self.team_id),
            ("ROLLUP_API_VERSION", &mut self.api_version),
            ("ROLLUP_RELEASE_FIELD", &mut self.release_field),
            ("ROLLUP_DEFAULT_RELEASE", &mut self.default_release),
            ("ROLLUP_DEFAULT_AREA_PATH", &mut self.default_area_path),
            ("ROLLUP_DEFAULT_STRATEGY", &mut self.default_strategy),
        ] {
            if let Ok(value) = std::env::var(var) {
                *slot = Some(value);
            }
        }
        if let Ok(value) = std::env::var("ROLLUP_MAX_DEPTH") {
            self.max_depth = Some(
                value
                    .parse()
                    .with_context(|| format!("Invalid ROLLUP_MAX_DEPTH: '{}'", value))?,
            );
        }
        if let Ok(value) = std::env::var("ROLLUP_PORT") {
            self.port = Some(
                value
                    .parse()
                    .with_context(|| format!("Invalid ROLLUP_PORT: '{}'", value))?,
            );
        }
        Ok(())
    }

    /// Remote field name holding the release tag, with default fallback.
    pub fn release_field(&self) -> String {
        self.release_field
            .clone()
            .unwrap_or_else(|| DEFAULT_RELEASE_FIELD.to_string())
    }

    /// Default relationship strategy name, with fallback.
    pub fn default_strategy(&self) -> String {
        self.default_strategy
            .clone()
            .unwrap_or_else(|| DEFAULT_STRATEGY.to_string())
    }

    /// Hierarchy recursion cap, with default fallback.
    pub fn max_depth(&self) -> u32 {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Server port, with default fallback.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RollupConfig::default();
        assert_eq!(config.release_field(), "Custom.Release");
        assert_eq!(config.default_strategy(), "hierarchy-only");
        assert_eq!(config.max_depth(), 10);
        assert_eq!(config.port(), 7010);
        assert!(config.org_url.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config: RollupConfig = toml::from_str(
            r#"
org_url = "https://tracker.example/org"
project = "Platform"
team_id = "platform-team"
api_version = "7.0"
release_field = "Custom.Release"
default_release = "25.1"
default_area_path = "Platform\\Web"
default_strategy = "hierarchy-with-related"
max_depth = 6
port = 8080
"#,
        )
        .unwrap();

        assert_eq!(config.org_url.as_deref(), Some("https://tracker.example/org"));
        assert_eq!(config.default_strategy(), "hierarchy-with-related");
        assert_eq!(config.max_depth(), 6);
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = RollupConfig::from_file(&temp_dir.path().join("rollup.toml")).unwrap();
        assert!(config.org_url.is_none());
        assert_eq!(config.max_depth(), 10);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rollup.toml");
        std::fs::write(&path, "[broken syntax").unwrap();
        assert!(RollupConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rollup.toml");
        std::fs::write(&path, "project = \"FromFile\"\n").unwrap();

        std::env::set_var("ROLLUP_PROJECT", "FromEnv");
        let config = RollupConfig::load(Some(&path)).unwrap();
        std::env::remove_var("ROLLUP_PROJECT");

        assert_eq!(config.project.as_deref(), Some("FromEnv"));
    }
}
