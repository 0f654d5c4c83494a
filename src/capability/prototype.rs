//! Prototypes: explicit method tables with an ordered list of applied capability sets.

use super::{CapabilitySet, ConflictPolicy, Member};
use crate::error::ReflectError;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything that owns a prototype and can therefore be extended.
pub trait Extensible {
    fn prototype(&self) -> &Prototype;
}

/// Shared method table.
///
/// Applied sets are kept in application order; lookups walk them newest-first, then continue at
/// the parent prototype.
pub struct Prototype {
    name: String,
    parent: Option<Arc<Prototype>>,
    layers: RwLock<Vec<Arc<CapabilitySet>>>,
}

impl Prototype {
    /// Prototype with no parent.
    pub fn base(name: impl Into<String>) -> Self {
        Prototype {
            name: name.into(),
            parent: None,
            layers: RwLock::new(Vec::new()),
        }
    }

    pub fn child_of(name: impl Into<String>, parent: &Arc<Prototype>) -> Self {
        Prototype {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
            layers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Prototype>> {
        self.parent.as_ref()
    }

    /// This prototype followed by its ancestors.
    pub fn chain(&self) -> impl Iterator<Item = &Prototype> {
        std::iter::successors(Some(self), |proto| proto.parent.as_deref())
    }

    pub fn inherits_from(&self, other: &Prototype) -> bool {
        self.chain().any(|proto| std::ptr::eq(proto, other))
    }

    /// Resolve a member along the chain.
    pub fn lookup(&self, name: &str) -> Option<Member> {
        self.chain()
            .find_map(|proto| proto.own_lookup(name).map(|(member, _)| member))
    }

    /// Resolve a member on this prototype only, with the set that contributed it.
    pub fn own_lookup(&self, name: &str) -> Option<(Member, Arc<CapabilitySet>)> {
        let layers = self.layers.read();
        layers.iter().rev().find_map(|set| {
            set.get(name)
                .map(|member| (member.clone(), Arc::clone(set)))
        })
    }

    /// Applied sets in application order.
    pub fn applied(&self) -> Vec<Arc<CapabilitySet>> {
        self.layers.read().clone()
    }

    pub fn has_applied(&self, set: &CapabilitySet) -> bool {
        self.layers.read().iter().any(|applied| applied.id() == set.id())
    }

    /// Member names visible through this prototype, including inherited ones.
    pub fn member_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for proto in self.chain() {
            for set in proto.layers.read().iter() {
                names.extend(set.member_names().map(str::to_string));
            }
        }
        names
    }

    /// Install initial sets without conflict checks.
    pub(crate) fn seed<I>(&self, sets: I)
    where
        I: IntoIterator<Item = Arc<CapabilitySet>>,
    {
        self.layers.write().extend(sets);
    }

    /// Newest set on an ancestor prototype that provides `member`.
    fn inherited_provider(&self, member: &str) -> Option<Arc<CapabilitySet>> {
        self.parent
            .as_deref()?
            .chain()
            .find_map(|proto| proto.own_lookup(member).map(|(_, set)| set))
    }

    /// Apply sets in order. A set that is already applied moves to the newest position instead of
    /// being duplicated. Under [`ConflictPolicy::Strict`] nothing is applied if any member would
    /// shadow a member of a different set, whether applied here or inherited from an ancestor.
    pub(crate) fn apply(
        &self,
        sets: &[Arc<CapabilitySet>],
        policy: ConflictPolicy,
    ) -> Result<(), ReflectError> {
        let mut layers = self.layers.write();

        if policy != ConflictPolicy::Silent {
            let incoming_ids: BTreeSet<_> = sets.iter().map(|set| set.id()).collect();
            let mut visible: Vec<&Arc<CapabilitySet>> = layers
                .iter()
                .filter(|set| !incoming_ids.contains(&set.id()))
                .collect();

            for set in sets {
                for member in set.member_names() {
                    let shadowed = visible
                        .iter()
                        .rev()
                        .find(|existing| existing.get(member).is_some())
                        .map(|existing| Arc::clone(existing))
                        .or_else(|| self.inherited_provider(member));
                    let Some(existing) = shadowed.filter(|existing| existing.id() != set.id()) else {
                        continue;
                    };
                    if policy == ConflictPolicy::Strict {
                        return Err(ReflectError::Conflict {
                            target: self.name.clone(),
                            member: member.to_string(),
                            incoming: set.label().to_string(),
                            existing: existing.label().to_string(),
                        });
                    }
                    warn!(
                        target_prototype = %self.name,
                        member,
                        incoming = set.label(),
                        existing = existing.label(),
                        "Capability member shadows an earlier definition"
                    );
                }
                visible.push(set);
            }
        }

        for set in sets {
            layers.retain(|applied| applied.id() != set.id());
            layers.push(Arc::clone(set));
            debug!(
                target_prototype = %self.name,
                set = set.label(),
                members = set.len(),
                "Applied capability set"
            );
        }

        Ok(())
    }
}

impl Extensible for Prototype {
    fn prototype(&self) -> &Prototype {
        self
    }
}

impl Extensible for Arc<Prototype> {
    fn prototype(&self) -> &Prototype {
        self
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field(
                "applied",
                &self
                    .layers
                    .read()
                    .iter()
                    .map(|set| set.label().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
