//! Error types for linked-model construction, capability composition and lazy facades.

use thiserror::Error;

/// Errors raised while linking a CSN document into a model.
///
/// Any of these aborts the whole build; no partially linked model is returned.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Cannot resolve '{reference}' referenced from {from}: {reason}")]
    Resolution {
        from: String,
        reference: String,
        reason: String,
    },

    #[error("Cyclic by-value struct nesting: {}", .cycle.join(" -> "))]
    CyclicStruct { cycle: Vec<String> },

    #[error("Unsupported definition kind '{kind}' for {name}")]
    UnsupportedKind { name: String, kind: String },

    #[error("Invalid CSN document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

impl LinkError {
    pub(crate) fn resolution(
        from: impl Into<String>,
        reference: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        LinkError::Resolution {
            from: from.into(),
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Umbrella error for the reflection surface.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Capability conflict on {target}: member '{member}' from '{incoming}' shadows '{existing}'")]
    Conflict {
        target: String,
        member: String,
        incoming: String,
        existing: String,
    },

    #[error("Lazy property '{0}' was read while its own resolver was running")]
    ReentrantResolution(String),

    #[error("Unknown lazy property: {0}")]
    UnknownKey(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Member '{0}' is not callable")]
    NotCallable(String),

    #[error("Invalid argument for '{member}': {reason}")]
    InvalidArgument { member: String, reason: String },

    #[error("Failed to load module '{id}': {reason}")]
    ModuleLoad { id: String, reason: String },

    #[error("Linked model for '{0}' has been dropped")]
    ModelDropped(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ReflectError {
    fn from(err: config::ConfigError) -> Self {
        ReflectError::ConfigError(err.to_string())
    }
}
