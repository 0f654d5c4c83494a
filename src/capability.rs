//! Capability Sets
//!
//! A capability set is a bundle of named members (methods, accessors and plain fields) contributed
//! by one extension call site. Sets are applied to [`Prototype`]s through [`extend`]; member lookup
//! walks the applied sets newest-first and then the parent prototype, so the most recently applied
//! set shadows earlier ones.

use crate::csn::Definition;
use crate::error::ReflectError;
use crate::linked::LinkedClass;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

mod extend;
mod prototype;

pub use extend::{extend, ConflictPolicy, Extension};
pub use prototype::{Extensible, Prototype};

/// Method member: receives the object it was looked up on plus call arguments.
pub type MethodFn =
    Arc<dyn Fn(&dyn Receiver, &[Value]) -> Result<Value, ReflectError> + Send + Sync>;

/// Accessor member: computed on every read from the receiving object.
pub type AccessorFn = Arc<dyn Fn(&dyn Receiver) -> Value + Send + Sync>;

/// A single capability member.
#[derive(Clone)]
pub enum Member {
    Method(MethodFn),
    Accessor(AccessorFn),
    Field(Value),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Accessor(_) => f.write_str("Accessor(..)"),
            Member::Field(value) => write!(f, "Field({})", value),
        }
    }
}

static NEXT_SET_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a capability set. Two sets never share an id, even with identical members.
pub type CapabilityId = u64;

/// Ordered bundle of members contributed by one extension call site.
pub struct CapabilitySet {
    id: CapabilityId,
    label: String,
    members: Vec<(String, Member)>,
}

impl CapabilitySet {
    /// Create an empty set. The label names its origin in logs and conflict errors.
    pub fn new(label: impl Into<String>) -> Self {
        CapabilitySet {
            id: NEXT_SET_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            members: Vec::new(),
        }
    }

    pub fn method<F>(self, name: &str, method: F) -> Self
    where
        F: Fn(&dyn Receiver, &[Value]) -> Result<Value, ReflectError> + Send + Sync + 'static,
    {
        self.member(name, Member::Method(Arc::new(method)))
    }

    pub fn accessor<F>(self, name: &str, accessor: F) -> Self
    where
        F: Fn(&dyn Receiver) -> Value + Send + Sync + 'static,
    {
        self.member(name, Member::Accessor(Arc::new(accessor)))
    }

    pub fn field(self, name: &str, value: impl Into<Value>) -> Self {
        self.member(name, Member::Field(value.into()))
    }

    /// Add a member; a later member of the same name replaces the earlier one within this set.
    pub fn member(mut self, name: &str, member: Member) -> Self {
        match self.members.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name.to_string(), member)),
        }
        self
    }

    pub fn id(&self) -> CapabilityId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, member)| member)
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("members", &self.member_names().collect::<Vec<_>>())
            .finish()
    }
}

/// An object members can be looked up on and invoked against.
pub trait Receiver: Extensible {
    /// Own data properties; these shadow every prototype member.
    fn own_property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// CSN definition backing this object, if any.
    fn definition(&self) -> Option<&Definition> {
        None
    }

    /// Linked class backing this object, if any.
    fn linked_class(&self) -> Option<&LinkedClass> {
        None
    }

    /// Fully-qualified name this object reflects.
    fn reflected_name(&self) -> Option<&str> {
        self.linked_class().map(LinkedClass::name)
    }
}

/// Dynamic member access for every [`Receiver`].
pub trait Reflect: Receiver + Sized {
    /// Read a property: own data first, then fields and accessors along the prototype chain.
    fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.own_property(name) {
            return Some(value);
        }
        match self.prototype().lookup(name)? {
            Member::Field(value) => Some(value),
            Member::Accessor(accessor) => Some(accessor(self)),
            Member::Method(_) => None,
        }
    }

    /// Invoke a method member.
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ReflectError> {
        match self.prototype().lookup(name) {
            Some(Member::Method(method)) => method(self, args),
            Some(_) => Err(ReflectError::NotCallable(name.to_string())),
            None => Err(ReflectError::MemberNotFound(name.to_string())),
        }
    }

    fn responds_to(&self, name: &str) -> bool {
        self.own_property(name).is_some() || self.prototype().lookup(name).is_some()
    }

    /// Prototype-chain identity check, the equivalent of `instanceof`.
    fn is_instance_of<E: Extensible + ?Sized>(&self, other: &E) -> bool {
        self.prototype().inherits_from(other.prototype())
    }
}

impl<T: Receiver> Reflect for T {}
