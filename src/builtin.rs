//! Base Class Hierarchy
//!
//! The seven reflection roots (`struct`, `type`, `array`, `event`, `entity`, `Association`,
//! `Composition`) plus the hosting framework's `service` root. Roots are process-wide singletons,
//! built once on first use. Every root prototype chains directly to the shared `Object` prototype,
//! so a linked definition is an instance of exactly one root; behavior shared between roots (for
//! example struct navigation on entities) is composed in as shared capability sets.

use crate::capability::{Extensible, Prototype};
use crate::csn::{self, Definition};
use crate::lazy::{lazify, lazy, LazyFacade};
use crate::linked::{Instance, LinkedClass};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

mod helpers;

/// A reflection root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Root {
    Association,
    Composition,
    #[serde(rename = "entity")]
    Entity,
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "array")]
    Array,
    #[serde(rename = "struct")]
    Struct,
    #[serde(rename = "service")]
    Service,
}

impl Root {
    /// All roots, in `builtin.classes` order.
    pub const ALL: [Root; 8] = [
        Root::Association,
        Root::Composition,
        Root::Entity,
        Root::Event,
        Root::Type,
        Root::Array,
        Root::Struct,
        Root::Service,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Root::Association => "Association",
            Root::Composition => "Composition",
            Root::Entity => "entity",
            Root::Event => "event",
            Root::Type => "type",
            Root::Array => "array",
            Root::Struct => "struct",
            Root::Service => "service",
        }
    }

    pub fn from_name(name: &str) -> Option<Root> {
        Root::ALL.into_iter().find(|root| root.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Shared prototype of this root.
    pub fn prototype_arc(self) -> &'static Arc<Prototype> {
        &roots().prototypes[self.index()]
    }

    /// The root a prototype chain terminates at, if any.
    pub fn of(prototype: &Prototype) -> Option<Root> {
        prototype.chain().find_map(|proto| {
            Root::ALL
                .into_iter()
                .find(|root| std::ptr::eq(proto, &**root.prototype_arc()))
        })
    }

    /// `new Root(definition?)`: an instance with no backing linked class.
    ///
    /// An absent definition is treated as an empty one.
    pub fn construct(self, definition: Option<Value>) -> Instance {
        Instance::of_root(self, definition)
    }

    pub fn is_reference(self) -> bool {
        matches!(self, Root::Association | Root::Composition)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Extensible for Root {
    fn prototype(&self) -> &Prototype {
        self.prototype_arc()
    }
}

struct Roots {
    object: Arc<Prototype>,
    prototypes: Vec<Arc<Prototype>>,
}

static ROOTS: OnceLock<Roots> = OnceLock::new();

fn roots() -> &'static Roots {
    ROOTS.get_or_init(|| {
        let object = Arc::new(Prototype::base("Object"));
        let sets = helpers::RootSets::new();
        let prototypes = Root::ALL
            .into_iter()
            .map(|root| {
                let proto = Prototype::child_of(root.name(), &object);
                proto.seed(sets.for_root(root));
                Arc::new(proto)
            })
            .collect();
        debug!(roots = Root::ALL.len(), "Initialized reflection roots");
        Roots { object, prototypes }
    })
}

/// The prototype every root chains to.
pub fn object_prototype() -> &'static Arc<Prototype> {
    &roots().object
}

/// `builtin.classes`: the reflection roots by name.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinClasses {
    pub association: Root,
    pub composition: Root,
    pub entity: Root,
    pub event: Root,
    pub r#type: Root,
    pub array: Root,
    pub r#struct: Root,
    pub service: Root,
}

impl BuiltinClasses {
    fn new() -> Self {
        BuiltinClasses {
            association: Root::Association,
            composition: Root::Composition,
            entity: Root::Entity,
            event: Root::Event,
            r#type: Root::Type,
            array: Root::Array,
            r#struct: Root::Struct,
            service: Root::Service,
        }
    }

    pub fn get(&self, name: &str) -> Option<Root> {
        Root::from_name(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Root)> {
        Root::ALL.into_iter().map(|root| (root.name(), root))
    }
}

/// The `builtin` reflection surface.
pub struct Builtin {
    pub classes: BuiltinClasses,
    /// Classes of the `cds.*` built-in types, created on first access.
    pub types: LazyFacade<Arc<LinkedClass>>,
}

static BUILTIN: OnceLock<Builtin> = OnceLock::new();

pub fn builtin() -> &'static Builtin {
    BUILTIN.get_or_init(|| {
        let names = csn::BUILTIN_SCALARS
            .iter()
            .chain([csn::ASSOCIATION_TYPE, csn::COMPOSITION_TYPE].iter());
        let types = lazify(names.map(|name| {
            let name = *name;
            (
                name,
                lazy(move || {
                    let root = match name {
                        csn::ASSOCIATION_TYPE => Root::Association,
                        csn::COMPOSITION_TYPE => Root::Composition,
                        _ => Root::Type,
                    };
                    Ok(Arc::new(LinkedClass::builtin(
                        name,
                        root,
                        Definition::of_kind("type"),
                    )))
                }),
            )
        }));
        Builtin {
            classes: BuiltinClasses::new(),
            types,
        }
    })
}
