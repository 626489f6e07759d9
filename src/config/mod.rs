//! Application configuration with layered loading.
//!
//! Configuration is read with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. The TOML config file named on the command line
//! 3. Environment variables (RAIDSHEET_*)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_LIFETIME;
use crate::data::sheets::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::data::SheetSource;
use crate::report::{Raid, RuleSpec};

mod validation;

pub use validation::ConfigError;

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "RAIDSHEET_";

/// Application configuration
///
/// ```toml
/// spreadsheet_url = "https://docs.google.com/spreadsheets/d/<id>/edit"
/// raid_name = "BWL"
/// sheet = "0"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spreadsheet URL as copied from the browser. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,

    /// Raid code (MC, BWL, AQ40, Naxx). Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raid_name: Option<String>,

    /// Tab to export: a numeric gid or a tab name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,

    /// Report path. Defaults to `<RAID>_assignments.txt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Directory holding cached exports.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Seconds a cached export stays fresh.
    #[serde(default = "default_cache_lifetime_secs")]
    pub cache_lifetime_secs: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Heading lines for a custom layout. Defaults to `# <RAID>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<Vec<String>>,

    /// Custom layout rules, replacing the raid's built-in layout.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache")
}

fn default_cache_lifetime_secs() -> u64 {
    DEFAULT_LIFETIME.as_secs()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spreadsheet_url: None,
            raid_name: None,
            sheet: None,
            output: None,
            cache_dir: default_cache_dir(),
            cache_lifetime_secs: default_cache_lifetime_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            heading: None,
            rules: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, then environment overrides, and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist or is not valid TOML
    /// - A value has the wrong type
    /// - Validation fails after loading
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()));

        Self::extract(figment)
    }

    /// Load configuration from TOML text without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(toml));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache lifetime as Duration.
    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime_secs)
    }

    /// The configured raid.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `raid_name` is not set, or
    /// `ConfigError::UnsupportedRaid` if it names an unknown raid.
    pub fn raid(&self) -> Result<Raid, ConfigError> {
        let name = self.raid_name.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "raid_name".into(),
            hint: format!("set raid_name to one of: {}", Raid::supported()),
        })?;
        Raid::from_str(name).ok_or_else(|| ConfigError::UnsupportedRaid {
            name: name.to_string(),
            supported: Raid::supported(),
        })
    }

    /// The spreadsheet and tab to export.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `spreadsheet_url` is not set, or
    /// `ConfigError::Source` if it is not a usable spreadsheet URL.
    pub fn source(&self) -> Result<SheetSource, ConfigError> {
        let url = self
            .spreadsheet_url
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                field: "spreadsheet_url".into(),
                hint: "set spreadsheet_url to the sheet's browser URL".into(),
            })?;
        Ok(SheetSource::parse(url, self.sheet.as_deref())?)
    }

    /// Where the report is written when no `--output` is given.
    pub fn output_path(&self, raid: Raid) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_assignments.txt", raid.code())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RuleKind;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        spreadsheet_url = "https://docs.google.com/spreadsheets/d/test123/edit"
        raid_name = "BWL"
        sheet = "0"
    "#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from(".cache"));
        assert_eq!(config.cache_lifetime_secs, 3600);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("raidsheet/"));
        assert!(config.spreadsheet_url.is_none());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.cache_lifetime(), Duration::from_secs(3600));
    }

    #[test]
    fn test_from_toml_minimal() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.raid().unwrap(), Raid::BlackwingLair);
        assert_eq!(config.source().unwrap().spreadsheet_id(), "test123");
        assert_eq!(config.cache_lifetime_secs, 3600);
    }

    #[test]
    fn test_from_toml_with_rules() {
        let toml = r##"
            spreadsheet_url = "https://docs.google.com/spreadsheets/d/test123/edit"
            raid_name = "MC"
            cache_lifetime_secs = 60
            heading = ["# MC"]

            [[rules]]
            kind = "range"
            title = "DECURSERS"
            column = "C"
            start_row = 2
            end_row = 6

            [[rules]]
            kind = "single"
            title = "MAIN TANK"
            column = "B"
            start_row = 2
        "##;

        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].kind, RuleKind::Range);
        assert_eq!(config.rules[1].end_row, None);
        assert_eq!(config.heading.as_deref(), Some(&["# MC".to_string()][..]));
        assert_eq!(config.cache_lifetime(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_required_key() {
        let result = AppConfig::from_toml_str(r#"raid_name = "MC""#);
        assert!(
            matches!(result, Err(ConfigError::Missing { ref field, .. }) if field == "spreadsheet_url")
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing required configuration key"));
    }

    #[test]
    fn test_unsupported_raid() {
        let toml = r#"
            spreadsheet_url = "https://docs.google.com/spreadsheets/d/test/edit"
            raid_name = "INVALID_RAID"
        "#;
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("Unsupported raid name"));
        assert!(err.to_string().contains("MC, BWL, AQ40, Naxx"));
    }

    #[test]
    fn test_invalid_url() {
        let toml = r#"
            spreadsheet_url = "invalid_url"
            raid_name = "MC"
        "#;
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Source(_)));
        assert!(err.to_string().contains("Invalid spreadsheet URL format"));
    }

    #[test]
    fn test_wrong_type_fails_to_load() {
        let toml = r#"
            spreadsheet_url = "https://docs.google.com/spreadsheets/d/test/edit"
            raid_name = "MC"
            timeout_secs = "soon"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(toml),
            Err(ConfigError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, MINIMAL).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.raid_name.as_deref(), Some("BWL"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.toml");

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "raid_name = [unclosed").unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_output_path_default_and_override() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(
            config.output_path(Raid::BlackwingLair),
            PathBuf::from("BWL_assignments.txt")
        );

        let config = AppConfig {
            output: Some(PathBuf::from("custom.txt")),
            ..config
        };
        assert_eq!(
            config.output_path(Raid::BlackwingLair),
            PathBuf::from("custom.txt")
        );
    }
}
