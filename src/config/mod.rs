//! Configuration module for reportsource.
//!
//! Handles the TOML config file, environment variable expansion and
//! conversion into the contexts the library works with.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, CleanupSection, DatabaseSettings, LoggingSettings,
    ReportSettings, Settings, SettingsError, CONFIG_ENV_VAR,
};
