use super::{builder, LinkedClass, LinkerConfig};
use crate::builtin::{self, Builtin, Root};
use crate::csn::CsnDocument;
use crate::error::{LinkError, ReflectError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub(crate) struct ModelInner {
    pub(crate) namespace: Option<String>,
    pub(crate) classes: BTreeMap<String, Arc<LinkedClass>>,
    /// Class names in link order: by-value dependencies before their dependents.
    pub(crate) order: Vec<String>,
}

/// A linked CSN model.
///
/// Cloning is cheap; clones share the same classes.
#[derive(Clone)]
pub struct LinkedModel {
    inner: Arc<ModelInner>,
}

impl LinkedModel {
    pub(crate) fn from_inner(inner: Arc<ModelInner>) -> Self {
        LinkedModel { inner }
    }

    /// Link a document with default linker settings.
    pub fn link(document: &CsnDocument) -> Result<Self, LinkError> {
        Self::link_with(document, &LinkerConfig::default())
    }

    pub fn link_with(document: &CsnDocument, config: &LinkerConfig) -> Result<Self, LinkError> {
        builder::link(document, config)
    }

    /// Parse and link a CSN JSON document.
    pub fn from_json(json: &str) -> Result<Self, LinkError> {
        Self::link(&CsnDocument::from_json(json)?)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    pub fn class(&self, name: &str) -> Option<&Arc<LinkedClass>> {
        self.inner.classes.get(name)
    }

    /// Like [`LinkedModel::class`], failing with a resolution error.
    pub fn require(&self, name: &str) -> Result<&Arc<LinkedClass>, ReflectError> {
        self.class(name).ok_or_else(|| {
            LinkError::resolution(self.namespace().unwrap_or("<model>"), name, "no such definition")
                .into()
        })
    }

    /// Every class in link order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<LinkedClass>> {
        self.inner
            .order
            .iter()
            .filter_map(|name| self.inner.classes.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.order.iter().map(String::as_str)
    }

    /// Classes rooted at `root`, in link order.
    pub fn each(&self, root: Root) -> impl Iterator<Item = &Arc<LinkedClass>> {
        self.classes().filter(move |class| class.root() == root)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<LinkedClass>> {
        self.each(Root::Entity)
    }

    pub fn events(&self) -> impl Iterator<Item = &Arc<LinkedClass>> {
        self.each(Root::Event)
    }

    pub fn services(&self) -> impl Iterator<Item = &Arc<LinkedClass>> {
        self.each(Root::Service)
    }

    pub fn len(&self) -> usize {
        self.inner.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.classes.is_empty()
    }

    /// The shared `builtin` surface, reachable from any model.
    pub fn builtin(&self) -> &'static Builtin {
        builtin::builtin()
    }

    /// Target class of the reference element `element` on class `owner`.
    pub fn target_of(&self, owner: &str, element: &str) -> Result<Arc<LinkedClass>, ReflectError> {
        let found = self.require(owner)?.element(element)?;
        match found.reference() {
            Some(reference) => reference.target_class(),
            None => Err(ReflectError::InvalidArgument {
                member: format!("{}.{}", owner, element),
                reason: "not an association or composition".to_string(),
            }),
        }
    }
}

impl fmt::Debug for LinkedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedModel")
            .field("namespace", &self.inner.namespace)
            .field("classes", &self.inner.order)
            .finish()
    }
}
