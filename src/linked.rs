//! Linked Models
//!
//! A linked model binds a CSN document to the reflection roots: every reflected definition becomes
//! a [`LinkedClass`] whose prototype chains to exactly one root. Elements are resolved lazily
//! through a [`LazyFacade`]; association and composition elements resolve to
//! [`ReferenceDescriptor`]s that name their target instead of embedding it, which is what lets
//! entities reference each other cyclically.

use crate::builtin::Root;
use crate::capability::{CapabilitySet, Extensible, Prototype, Receiver};
use crate::csn::{Cardinality, Definition};
use crate::error::{LinkError, ReflectError};
use crate::lazy::{lazify, lazy, LazyFacade};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

mod builder;
mod instance;
mod model;
mod registry;

pub use instance::Instance;
pub use model::LinkedModel;
pub use registry::{model_registry, DocumentLoader};

pub(crate) use model::ModelInner;

/// What to do with definitions of a kind the linker does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKindPolicy {
    /// Leave them out of the model.
    #[default]
    Skip,
    /// Fail the build with [`LinkError::UnsupportedKind`].
    Reject,
}

/// Linker settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerConfig {
    #[serde(default)]
    pub unknown_kinds: UnknownKindPolicy,
}

/// Runtime class synthesized from one definition.
pub struct LinkedClass {
    name: String,
    root: Root,
    definition: Definition,
    prototype: Arc<Prototype>,
    elements: LazyFacade<Element>,
    model: Weak<ModelInner>,
}

impl LinkedClass {
    pub(crate) fn new(
        name: String,
        root: Root,
        definition: Definition,
        parent: &Arc<Prototype>,
        model: Weak<ModelInner>,
    ) -> Self {
        let prototype = Prototype::child_of(name.clone(), parent);
        prototype.seed(own_members(&name, &definition));
        let elements = element_facade(&name, &definition, &model);

        LinkedClass {
            name,
            root,
            definition,
            prototype: Arc::new(prototype),
            elements,
            model,
        }
    }

    /// Class of a built-in type; it belongs to no model.
    pub(crate) fn builtin(name: &str, root: Root, definition: Definition) -> Self {
        Self::new(
            name.to_string(),
            root,
            definition,
            root.prototype_arc(),
            Weak::new(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Root {
        self.root
    }

    /// Declared CSN kind, or the root name when the definition declares none.
    pub fn kind(&self) -> &str {
        self.definition.kind().unwrap_or(self.root.name())
    }

    /// Effective definition, with included aspects and inherited base properties merged in.
    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn prototype_arc(&self) -> &Arc<Prototype> {
        &self.prototype
    }

    /// Prototype this class extends: a base type's class or a root.
    pub fn base(&self) -> Option<&Arc<Prototype>> {
        self.prototype.parent()
    }

    pub fn elements(&self) -> &LazyFacade<Element> {
        &self.elements
    }

    /// Resolve one element, linking its type on first access.
    pub fn element(&self, name: &str) -> Result<Element, ReflectError> {
        self.elements.get(name)
    }

    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys()
    }

    pub fn keys(&self) -> Vec<String> {
        self.definition.key_names()
    }

    /// `new Class(data?)`.
    pub fn new_instance(self: &Arc<Self>, data: Option<Value>) -> Instance {
        Instance::of_class(self, data)
    }

    /// The model this class belongs to, while it is alive.
    pub fn model(&self) -> Option<LinkedModel> {
        self.model.upgrade().map(LinkedModel::from_inner)
    }
}

impl Extensible for LinkedClass {
    fn prototype(&self) -> &Prototype {
        &self.prototype
    }
}

impl Receiver for LinkedClass {
    fn definition(&self) -> Option<&Definition> {
        Some(&self.definition)
    }

    fn linked_class(&self) -> Option<&LinkedClass> {
        Some(self)
    }
}

impl fmt::Debug for LinkedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedClass")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("elements", &self.elements)
            .finish()
    }
}

/// Annotations and doc comments become fields on the class's own layer.
fn own_members(name: &str, definition: &Definition) -> Option<Arc<CapabilitySet>> {
    let mut set = CapabilitySet::new(name);
    for (annotation, value) in definition.annotations() {
        set = set.field(annotation, value.clone());
    }
    if let Some(doc) = &definition.doc {
        set = set.field("doc", doc.clone());
    }
    (!set.is_empty()).then(|| set.shared())
}

fn element_facade(
    owner: &str,
    definition: &Definition,
    model: &Weak<ModelInner>,
) -> LazyFacade<Element> {
    let Some(elements) = definition.payload() else {
        return lazify(Vec::<(String, _)>::new());
    };
    lazify(elements.iter().map(|(name, element)| {
        let owner = owner.to_string();
        let element_name = name.clone();
        let element = Arc::new(element.clone());
        let model = model.clone();
        (
            name.clone(),
            lazy(move || builder::materialize_element(&owner, &element_name, &element, &model)),
        )
    }))
}

/// An element of a structured class.
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    definition: Arc<Definition>,
    shape: ElementShape,
}

/// What an element resolved to.
#[derive(Debug, Clone)]
pub enum ElementShape {
    /// Named type, built-in type, or an inline struct/array class.
    Class(Arc<LinkedClass>),
    /// Association or composition.
    Reference(Arc<ReferenceDescriptor>),
    /// No type information.
    Untyped,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn shape(&self) -> &ElementShape {
        &self.shape
    }

    pub fn is_key(&self) -> bool {
        self.definition.key
    }

    pub fn class(&self) -> Option<&Arc<LinkedClass>> {
        match &self.shape {
            ElementShape::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&Arc<ReferenceDescriptor>> {
        match &self.shape {
            ElementShape::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

/// Association or composition element.
///
/// Carries the target's name, not the target class, so cyclic entity references stay cheap.
pub struct ReferenceDescriptor {
    name: String,
    element: String,
    root: Root,
    target: String,
    definition: Definition,
    prototype: Prototype,
    model: Weak<ModelInner>,
}

impl ReferenceDescriptor {
    pub(crate) fn new(
        owner: &str,
        element: &str,
        root: Root,
        definition: Definition,
        model: Weak<ModelInner>,
    ) -> Result<Self, LinkError> {
        let name = format!("{}.{}", owner, element);
        let target = definition.target.clone().ok_or_else(|| {
            LinkError::resolution(
                &name,
                definition.type_name.as_deref().unwrap_or(root.name()),
                "reference without target",
            )
        })?;
        let prototype = Prototype::child_of(name.clone(), root.prototype_arc());

        Ok(ReferenceDescriptor {
            name,
            element: element.to_string(),
            root,
            target,
            definition,
            prototype,
            model,
        })
    }

    /// Qualified name: `<owner>.<element>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_name(&self) -> &str {
        &self.element
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn is_composition(&self) -> bool {
        self.root == Root::Composition
    }

    pub fn cardinality(&self) -> Option<&Cardinality> {
        self.definition.cardinality.as_ref()
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality().is_some_and(Cardinality::is_to_many)
    }

    pub fn on(&self) -> Option<&[Value]> {
        self.definition.on.as_deref()
    }

    /// Managed references join through foreign keys instead of an explicit `on` condition.
    pub fn is_managed(&self) -> bool {
        self.definition.on.is_none()
    }

    /// Linked class of the target entity.
    pub fn target_class(&self) -> Result<Arc<LinkedClass>, ReflectError> {
        let model = self
            .model
            .upgrade()
            .ok_or_else(|| ReflectError::ModelDropped(self.name.clone()))?;
        model.classes.get(&self.target).cloned().ok_or_else(|| {
            LinkError::resolution(&self.name, &self.target, "target not found").into()
        })
    }

    /// Foreign key names: the declared keys, else the target's keys for managed to-one references.
    pub fn foreign_keys(&self) -> Result<Vec<String>, ReflectError> {
        if let Some(keys) = &self.definition.keys {
            return Ok(keys.iter().map(|key| key.name()).collect());
        }
        if !self.is_managed() || self.is_to_many() {
            return Ok(Vec::new());
        }
        Ok(self.target_class()?.keys())
    }
}

impl Extensible for ReferenceDescriptor {
    fn prototype(&self) -> &Prototype {
        &self.prototype
    }
}

impl Receiver for ReferenceDescriptor {
    fn definition(&self) -> Option<&Definition> {
        Some(&self.definition)
    }

    fn reflected_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl fmt::Debug for ReferenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceDescriptor")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("target", &self.target)
            .finish()
    }
}
