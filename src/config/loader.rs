//! Configuration loading.
//!
//! The embedded default document is merged underneath the service's own
//! file, then environment overrides are applied, then zero values are
//! normalized and the result is validated.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use toml::{Table, Value};

use crate::config::schema::TechConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Built-in defaults, shipped inside the binary.
pub const DEFAULT_CONFIG: &str = include_str!("../../config/tech.config.toml");

pub const ENV_SERVICE_NAME: &str = "TECH_SERVICE_NAME";
pub const ENV_SERVICE_DEBUG: &str = "TECH_SERVICE_DEBUG";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    tech: TechConfig,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TechConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = load_from_str(&content)?;
    tracing::debug!(path = %path.display(), "Configuration file loaded");
    Ok(config)
}

/// Load the embedded defaults only.
pub fn load_default() -> Result<TechConfig, ConfigError> {
    load_from_str("")
}

/// Load and validate configuration from TOML text, using process
/// environment overrides.
pub fn load_from_str(content: &str) -> Result<TechConfig, ConfigError> {
    load_with_env(content, |key| std::env::var(key).ok())
}

/// Load and validate configuration from TOML text with an explicit
/// environment lookup.
pub fn load_with_env<F>(content: &str, env: F) -> Result<TechConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged: Table = toml::from_str(DEFAULT_CONFIG)?;
    let overlay: Table = toml::from_str(content)?;
    merge_tables(&mut merged, overlay);

    let document: ConfigDocument = Value::Table(merged).try_into()?;
    let mut config = document.tech;

    apply_env_overrides(&mut config, env);
    config.normalize();
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Recursively merge `overlay` into `base`; overlay values win.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Environment values take precedence over the file for service identity.
fn apply_env_overrides<F>(config: &mut TechConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = env(ENV_SERVICE_NAME).filter(|v| !v.is_empty()) {
        config.service.name = name;
    }

    if let Some(raw) = env(ENV_SERVICE_DEBUG).filter(|v| !v.is_empty()) {
        match parse_bool(&raw) {
            Some(debug) => config.service.debug = debug,
            None => tracing::warn!(
                variable = ENV_SERVICE_DEBUG,
                value = %raw,
                "Ignoring unparsable boolean"
            ),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}
