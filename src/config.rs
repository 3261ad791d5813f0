/*!
 * Configuration support for SmartFlow
 *
 * Settings are layered: built-in defaults, then the user config file
 * (`~/.config/smartflow/config.toml`), then `SMARTFLOW_*` environment
 * variables. Nested keys use a double underscore, e.g.
 * `SMARTFLOW_SHEET_NAMES__LINE_ITEMS="DR 2"`.
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_DATE_FORMAT;
use crate::report::{QlabFilter, SheetNames};
use crate::rules::{ProfileKind, RuleProfile};
use crate::{ExportFormat, Result, SmartFlowError};

/// Runtime configuration for a SmartFlow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartFlowConfig {
    /// Built-in rule profile, used when `rules_file` is unset
    #[serde(default)]
    pub profile: ProfileKind,

    /// TOML rule profile overriding the built-in one
    #[serde(default)]
    pub rules_file: Option<PathBuf>,

    /// chrono format string for the line-item date column
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Default export format
    #[serde(default)]
    pub default_export_format: ExportFormat,

    #[serde(default)]
    pub sheet_names: SheetNames,

    #[serde(default)]
    pub qlab_filter: QlabFilter,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for SmartFlowConfig {
    fn default() -> Self {
        Self {
            profile: ProfileKind::default(),
            rules_file: None,
            date_format: default_date_format(),
            default_export_format: ExportFormat::default(),
            sheet_names: SheetNames::default(),
            qlab_filter: QlabFilter::default(),
        }
    }
}

impl SmartFlowConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// The rule profile this configuration selects, validated
    pub fn resolve_profile(&self) -> Result<RuleProfile> {
        let profile = match &self.rules_file {
            Some(path) => RuleProfile::from_file(path)?,
            None => self.profile.profile(),
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SmartFlowError::file_not_found_with_suggestion(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| SmartFlowError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SmartFlowError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/smartflow/config.toml` on Unix-like systems
    /// or `%APPDATA%\smartflow\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "smartflow")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the layered configuration from the default file location
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) => Self::layered(&path, false),
            None => Self::layered_without_file(),
        }
    }

    /// Load the layered configuration with an explicit file, which must exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SmartFlowError::file_not_found_with_suggestion(path.to_path_buf()));
        }
        Self::layered(path, true)
    }

    fn layered(path: &Path, required: bool) -> Result<Self> {
        debug!(path = %path.display(), required, "loading configuration");
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path.to_path_buf()).required(required))
            .add_source(environment())
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    fn layered_without_file() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(environment())
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("SMARTFLOW")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Builder for customizing configuration
#[derive(Default)]
pub struct ConfigBuilder {
    config: SmartFlowConfig,
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the built-in rule profile
    pub fn profile(mut self, profile: ProfileKind) -> Self {
        self.config.profile = profile;
        self
    }

    /// Use a TOML rule profile instead of a built-in one
    pub fn rules_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.rules_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the line-item date format
    pub fn date_format<S: Into<String>>(mut self, format: S) -> Self {
        self.config.date_format = format.into();
        self
    }

    /// Set the default export format
    pub fn export_format(mut self, format: ExportFormat) -> Self {
        self.config.default_export_format = format;
        self
    }

    pub fn sheet_names(mut self, names: SheetNames) -> Self {
        self.config.sheet_names = names;
        self
    }

    pub fn qlab_filter(mut self, filter: QlabFilter) -> Self {
        self.config.qlab_filter = filter;
        self
    }

    /// Build the configuration
    pub fn build(self) -> SmartFlowConfig {
        self.config
    }
}
