//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::ReflectConfig;
use crate::error::ReflectError;
use config::{Environment, File};
use std::path::Path;
use tracing::debug;

/// Loads [`ReflectConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root`.
    ///
    /// Precedence (lowest to highest): defaults, global file, `config/config.toml`,
    /// `config/{CSN_LINK_ENV}.toml`, `CSN_LINK__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<ReflectConfig, ReflectError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let settings = builder.add_source(environment()).build()?;

        debug!(workspace = %workspace_root.display(), "Loaded configuration");
        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from a single file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<ReflectConfig, ReflectError> {
        let settings = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Write `config` as TOML.
    pub fn save_to_file(config: &ReflectConfig, path: &Path) -> Result<(), ReflectError> {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| ReflectError::ConfigError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, rendered).map_err(|e| {
            ReflectError::ConfigError(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    pub fn default() -> ReflectConfig {
        ReflectConfig::default()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("CSN_LINK")
        .prefix_separator("__")
        .separator("__")
}
