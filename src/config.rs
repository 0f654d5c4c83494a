//! Configuration System
//!
//! Layered configuration for the reflection layer: built-in defaults, then the global file,
//! then workspace files, then `CSN_LINK__*` environment overrides. Tests included.

use crate::capability::ConflictPolicy;
use crate::linked::LinkerConfig;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectConfig {
    /// Capability composition settings
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// Model linking settings
    #[serde(default)]
    pub linker: LinkerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Capability composition settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Policy applied by [`ReflectConfig::extend`] when a member shadows another set's member
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ReflectConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let logging = &self.logging;

        if !LOG_LEVELS.contains(&logging.level.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "Invalid level '{}'",
                logging.level
            )));
        }
        if logging.format != "json" && logging.format != "text" {
            errors.push(ValidationError::Logging(format!(
                "Invalid format '{}' (must be 'json' or 'text')",
                logging.format
            )));
        }
        if !["stdout", "stderr", "file"].contains(&logging.output.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "Invalid output '{}' (must be 'stdout', 'stderr' or 'file')",
                logging.output
            )));
        }
        if logging.output == "file" && logging.file.as_os_str().is_empty() {
            errors.push(ValidationError::Logging(
                "Log file path cannot be empty".to_string(),
            ));
        }
        for (module, level) in &logging.modules {
            if !LOG_LEVELS.contains(&level.as_str()) {
                errors.push(ValidationError::Logging(format!(
                    "Invalid level '{}' for module '{}'",
                    level, module
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Start an extension that uses the configured conflict policy.
    pub fn extend<'a, T>(&self, target: &'a T) -> crate::capability::Extension<'a, T>
    where
        T: crate::capability::Extensible + ?Sized,
    {
        crate::capability::extend(target).policy(self.extension.conflict_policy)
    }
}
