//! TOML-based configuration for reportsource.
//!
//! Supports a config file (reportsource.toml) with environment variable
//! expansion in path values.
//!
//! Example configuration:
//! ```toml
//! [database]
//! path = "${MOODLE_SQLITE}"
//!
//! [report]
//! table_prefix = "mdl_"
//! timezone = "Australia/Perth"
//! date_format = "%-d %B %Y, %-I:%M %p"
//!
//! [catalog]
//! modules = ["assign", "quiz", "forum"]
//!
//! [cleanup]
//! retention_days = 30
//! batch_span_secs = 86400
//! max_runtime_secs = 1200
//! log_table = "analytics_log"
//! timestamp_column = "timecreated"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;

use crate::cleanup::CleanupSettings;
use crate::metadata::StaticCatalog;
use crate::report::{is_valid_date_format, RenderContext, DEFAULT_DATE_FORMAT};
use crate::sql::is_safe_identifier;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REPORTSOURCE_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub report: ReportSettings,
    pub catalog: CatalogSettings,
    pub cleanup: CleanupSection,
    pub logging: LoggingSettings,
}

/// SQLite database holding the host tables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the database file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl DatabaseSettings {
    /// The configured path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

/// How composed reports are named and rendered.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Prefix of every physical table name.
    pub table_prefix: String,

    /// IANA timezone used by date formatters.
    pub timezone: String,

    /// strftime pattern used by the `userdate` formatter.
    pub date_format: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            table_prefix: "mdl_".to_string(),
            timezone: "UTC".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// Catalog used when no database is available.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Installed activity modules, assumed to use the standard table layout.
    pub modules: Vec<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            modules: ["assign", "quiz", "forum", "page", "resource"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// `[cleanup]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanupSection {
    /// Days of log kept. Zero disables the cleanup task.
    pub retention_days: u32,

    pub batch_span_secs: u64,

    pub max_runtime_secs: u64,

    /// Log table name, without prefix.
    pub log_table: String,

    pub timestamp_column: String,
}

impl Default for CleanupSection {
    fn default() -> Self {
        Self {
            retention_days: 30,
            batch_span_secs: 86_400,
            max_runtime_secs: 20 * 60,
            log_table: "analytics_log".to_string(),
            timestamp_column: "timecreated".to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `REPORTSOURCE_CONFIG`
    /// 2. `./reportsource.toml`
    /// 3. `<config dir>/reportsource/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(expand_env_vars(&path)?);
        }

        let local_config = PathBuf::from("reportsource.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("reportsource").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject values that would otherwise fail late or reach SQL text.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.timezone()?;
        if !is_valid_date_format(&self.report.date_format) {
            return Err(SettingsError::InvalidConfig(format!(
                "report.date_format '{}' is not a valid strftime pattern",
                self.report.date_format
            )));
        }
        if !self.report.table_prefix.is_empty() && !is_safe_identifier(&self.report.table_prefix) {
            return Err(unsafe_name("report.table_prefix", &self.report.table_prefix));
        }
        if !is_safe_identifier(&self.cleanup.log_table) {
            return Err(unsafe_name("cleanup.log_table", &self.cleanup.log_table));
        }
        if !is_safe_identifier(&self.cleanup.timestamp_column) {
            return Err(unsafe_name(
                "cleanup.timestamp_column",
                &self.cleanup.timestamp_column,
            ));
        }
        if self.cleanup.batch_span_secs == 0 {
            return Err(SettingsError::InvalidConfig(
                "cleanup.batch_span_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, SettingsError> {
        self.report
            .timezone
            .parse::<Tz>()
            .map_err(|_| SettingsError::UnknownTimezone(self.report.timezone.clone()))
    }

    /// Render context for an anonymous viewer using the configured timezone
    /// and date format.
    pub fn render_context(&self) -> Result<RenderContext, SettingsError> {
        Ok(RenderContext::new(self.timezone()?).with_date_format(&self.report.date_format))
    }

    pub fn cleanup_settings(&self) -> CleanupSettings {
        CleanupSettings {
            retention_days: self.cleanup.retention_days,
            batch_span: Duration::from_secs(self.cleanup.batch_span_secs),
            max_runtime: Duration::from_secs(self.cleanup.max_runtime_secs),
        }
    }

    /// Physical name of the cleanup log table.
    pub fn log_table(&self) -> String {
        format!("{}{}", self.report.table_prefix, self.cleanup.log_table)
    }

    /// Catalog built from `[catalog] modules`, each with the standard
    /// activity table layout.
    pub fn static_catalog(&self) -> StaticCatalog {
        let names: Vec<&str> = self.catalog.modules.iter().map(String::as_str).collect();
        StaticCatalog::new().with_standard_modules(&self.report.table_prefix, &names)
    }
}

fn unsafe_name(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidConfig(format!(
        "{key} '{value}' may only contain [A-Za-z0-9_]"
    ))
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.next_if_eq(&'{').is_some() {
            let mut var_name = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated '${{{var_name}' in {s:?}"
                )));
            }
            if var_name.is_empty() {
                return Err(SettingsError::InvalidConfig(format!(
                    "empty variable name '${{}}' in {s:?}"
                )));
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
            continue;
        }

        let mut var_name = String::new();
        while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
            var_name.push(ch);
        }
        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
