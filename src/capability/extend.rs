//! `extend(target).with(sets)`: the extension engine entry point.

use super::{CapabilitySet, Extensible};
use crate::error::ReflectError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when an applied member shadows one contributed by a different set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Last applied wins without notice.
    #[default]
    Silent,
    /// Last applied wins; the shadowing is logged.
    Warn,
    /// Shadowing an applied or inherited member fails with [`ReflectError::Conflict`] and nothing
    /// is applied.
    Strict,
}

/// Pending extension of one target.
#[must_use = "an extension does nothing until `with` is called"]
pub struct Extension<'a, T: Extensible + ?Sized> {
    target: &'a T,
    policy: ConflictPolicy,
}

/// Start extending `target`.
///
/// ```
/// use csn_link::capability::{extend, CapabilitySet, Reflect};
/// use csn_link::builtin::Root;
///
/// extend(&Root::Entity)
///     .with([CapabilitySet::new("audit").field("audited", true).shared()])
///     .unwrap();
/// assert_eq!(Root::Entity.construct(None).get("audited"), Some(true.into()));
/// ```
pub fn extend<T: Extensible + ?Sized>(target: &T) -> Extension<'_, T> {
    Extension {
        target,
        policy: ConflictPolicy::default(),
    }
}

impl<'a, T: Extensible + ?Sized> Extension<'a, T> {
    pub fn policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply `sets` in order and hand back the (mutated) target.
    pub fn with<I>(self, sets: I) -> Result<&'a T, ReflectError>
    where
        I: IntoIterator<Item = Arc<CapabilitySet>>,
    {
        let sets: Vec<_> = sets.into_iter().collect();
        self.target.prototype().apply(&sets, self.policy)?;
        Ok(self.target)
    }
}
