//! Instances of linked classes and of bare roots.

use super::LinkedClass;
use crate::builtin::Root;
use crate::capability::{Extensible, Prototype, Receiver};
use crate::csn::Definition;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

/// A constructed object.
///
/// Each instance has its own prototype layer chained to its class (or root), so extending one
/// instance never leaks into its class. Own data shadows every prototype member.
pub struct Instance {
    class: Option<Arc<LinkedClass>>,
    root: Root,
    definition: Option<Definition>,
    prototype: Prototype,
    data: Map<String, Value>,
}

fn object_data(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

impl Instance {
    pub(crate) fn of_class(class: &Arc<LinkedClass>, data: Option<Value>) -> Self {
        Instance {
            class: Some(Arc::clone(class)),
            root: class.root(),
            definition: None,
            prototype: Prototype::child_of(format!("{} instance", class.name()), class.prototype_arc()),
            data: object_data(data),
        }
    }

    /// Root instance reflecting the passed object as its definition. Own data starts empty.
    pub(crate) fn of_root(root: Root, definition: Option<Value>) -> Self {
        let definition = Value::Object(object_data(definition));
        let definition = serde_json::from_value(definition).unwrap_or_else(|err| {
            warn!(root = %root, error = %err, "Malformed definition, reflecting an empty one");
            Definition::default()
        });
        Instance {
            class: None,
            root,
            definition: Some(definition),
            prototype: Prototype::child_of(format!("{} instance", root), root.prototype_arc()),
            data: Map::new(),
        }
    }

    pub fn class(&self) -> Option<&Arc<LinkedClass>> {
        self.class.as_ref()
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(name.into(), value.into());
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }
}

impl Extensible for Instance {
    fn prototype(&self) -> &Prototype {
        &self.prototype
    }
}

impl Receiver for Instance {
    fn own_property(&self, name: &str) -> Option<Value> {
        self.data.get(name).cloned()
    }

    fn definition(&self) -> Option<&Definition> {
        match &self.class {
            Some(class) => Some(class.definition()),
            None => self.definition.as_ref(),
        }
    }

    fn linked_class(&self) -> Option<&LinkedClass> {
        self.class.as_deref()
    }
}
