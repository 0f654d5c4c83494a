//! Linked-model construction.
//!
//! Linking runs in two phases. Planning validates every reference, orders definitions so that
//! by-value dependencies (base types, included aspects, by-value element types) come first, and
//! picks each definition's root. Only when planning succeeds are classes synthesized, so a failed
//! build never yields a partial model.

use super::{
    Element, ElementShape, LinkedClass, LinkedModel, LinkerConfig, ModelInner,
    ReferenceDescriptor, UnknownKindPolicy,
};
use crate::builtin::{builtin, Root};
use crate::csn::{builtin_type_name, CsnDocument, Definition, ElementMap};
use crate::error::{LinkError, ReflectError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// How the linker treats a definition kind.
enum Reflection {
    Reflected,
    Skipped,
}

fn reflection_of(definition: &Definition) -> Option<Reflection> {
    match definition.kind() {
        None
        | Some("entity")
        | Some("type")
        | Some("aspect")
        | Some("event")
        | Some("action")
        | Some("function")
        | Some("service")
        | Some("struct")
        | Some("array")
        | Some("Association")
        | Some("Composition") => Some(Reflection::Reflected),
        Some("context") | Some("annotation") | Some("namespace") => Some(Reflection::Skipped),
        Some(_) => None,
    }
}

/// Base type of a non-reference definition that names another definition. A document
/// definition wins over the unqualified built-in alias of the same name.
fn named_base<'d>(
    definition: &'d Definition,
    defined: &impl Fn(&str) -> bool,
) -> Option<&'d str> {
    if definition.is_reference() {
        return None;
    }
    definition
        .type_name
        .as_deref()
        .filter(|name| defined(name) || builtin_type_name(name).is_none())
}

/// One class to synthesize.
pub(super) struct Plan {
    name: String,
    root: Root,
    definition: Definition,
    base: Option<String>,
}

struct Resolver<'a> {
    reflected: &'a BTreeMap<&'a str, &'a Definition>,
}

impl Resolver<'_> {
    fn check(&self, path: &str, definition: &Definition) -> Result<(), LinkError> {
        for aspect in &definition.includes {
            if !self.reflected.contains_key(aspect.as_str()) {
                return Err(LinkError::resolution(path, aspect, "unknown aspect"));
            }
        }

        if definition.is_reference() {
            self.check_reference(path, definition)?;
        } else if let Some(type_name) = &definition.type_name {
            self.check_type(path, type_name)?;
        }

        if let Some(elements) = definition.payload() {
            for (name, element) in elements.iter() {
                self.check(&format!("{}.{}", path, name), element)?;
            }
        }
        if let Some(items) = &definition.items {
            self.check(&format!("{}[]", path), items)?;
        }
        if let Some(returns) = &definition.returns {
            self.check(&format!("{}:returns", path), returns)?;
        }
        Ok(())
    }

    fn check_reference(&self, path: &str, definition: &Definition) -> Result<(), LinkError> {
        let Some(target) = &definition.target else {
            let type_name = definition.type_name.as_deref().unwrap_or("Association");
            return Err(LinkError::resolution(path, type_name, "reference without target"));
        };
        match self.reflected.get(target.as_str()) {
            None => Err(LinkError::resolution(path, target, "target not found")),
            Some(found) if found.kind() != Some("entity") => {
                Err(LinkError::resolution(path, target, "target is not an entity"))
            }
            Some(_) => Ok(()),
        }
    }

    fn check_type(&self, path: &str, type_name: &str) -> Result<(), LinkError> {
        if builtin_type_name(type_name).is_some() || self.reflected.contains_key(type_name) {
            Ok(())
        } else {
            Err(LinkError::resolution(path, type_name, "unknown type"))
        }
    }
}

/// Definitions a definition embeds by value. Arrays, return types and references hold their
/// types by reference and do not constrain ordering.
fn value_dependencies<'d>(
    definition: &'d Definition,
    defined: &impl Fn(&str) -> bool,
    deps: &mut BTreeSet<&'d str>,
) {
    deps.extend(definition.includes.iter().map(String::as_str));
    if let Some(base) = named_base(definition, defined) {
        deps.insert(base);
    }
    if let Some(elements) = definition.payload() {
        for (_, element) in elements.iter() {
            value_dependencies(element, defined, deps);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first topological order over by-value dependencies.
fn topological_order(reflected: &BTreeMap<&str, &Definition>) -> Result<Vec<String>, LinkError> {
    fn visit<'a>(
        name: &'a str,
        reflected: &BTreeMap<&'a str, &'a Definition>,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<(), LinkError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|entry| *entry == name).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(name.to_string());
                return Err(LinkError::CyclicStruct { cycle });
            }
            None => {}
        }
        let Some((&name, &definition)) = reflected.get_key_value(name) else {
            return Ok(());
        };

        marks.insert(name, Mark::Visiting);
        stack.push(name);
        let mut deps = BTreeSet::new();
        value_dependencies(definition, &|name: &str| reflected.contains_key(name), &mut deps);
        for dep in deps {
            if let Some((&dep, _)) = reflected.get_key_value(dep) {
                visit(dep, reflected, marks, stack, order)?;
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    let mut marks = BTreeMap::new();
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(reflected.len());
    for &name in reflected.keys() {
        visit(name, reflected, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

/// Fill properties a derived definition leaves unset from its base.
pub(super) fn inherit_missing(definition: &mut Definition, base: &Definition) {
    if definition.elements.is_none() && definition.items.is_none() {
        definition.elements = base.elements.clone();
        definition.items = base.items.clone();
    }
    if definition.target.is_none() {
        definition.target = base.target.clone();
        definition.cardinality = definition.cardinality.take().or_else(|| base.cardinality.clone());
        definition.on = definition.on.take().or_else(|| base.on.clone());
        definition.keys = definition.keys.take().or_else(|| base.keys.clone());
    }
    definition.length = definition.length.or(base.length);
    definition.precision = definition.precision.or(base.precision);
    definition.scale = definition.scale.or(base.scale);
    if definition.enum_values.is_none() {
        definition.enum_values = base.enum_values.clone();
    }
}

/// Included aspects' elements first, own elements replacing same-named ones in place.
fn merge_includes(definition: &mut Definition, effective: &BTreeMap<String, Definition>) {
    if definition.includes.is_empty() {
        return;
    }
    let mut merged = ElementMap::new();
    for aspect in &definition.includes {
        let Some(aspect) = effective.get(aspect) else {
            continue;
        };
        for (name, element) in aspect.elements.iter().flat_map(ElementMap::iter) {
            merged.insert(name.clone(), element.clone());
        }
    }
    for (name, element) in definition.elements.iter().flat_map(ElementMap::iter) {
        merged.insert(name.clone(), element.clone());
    }
    definition.elements = Some(merged);
}

/// Root for a definition whose by-value dependencies are already planned.
fn select_root(definition: &Definition, planned: &BTreeMap<String, Root>) -> (Root, Option<String>) {
    let root = match definition.kind() {
        Some("entity") => Root::Entity,
        Some("event") | Some("action") | Some("function") => Root::Event,
        Some("service") => Root::Service,
        Some("aspect") | Some("struct") => Root::Struct,
        Some("array") => Root::Array,
        Some("Association") => Root::Association,
        Some("Composition") => Root::Composition,
        _ => match definition.reference_kind() {
            Some(true) => Root::Composition,
            Some(false) => Root::Association,
            None => return select_type_root(definition, planned),
        },
    };
    (root, None)
}

fn select_type_root(
    definition: &Definition,
    planned: &BTreeMap<String, Root>,
) -> (Root, Option<String>) {
    if let Some(base) = named_base(definition, &|name: &str| planned.contains_key(name)) {
        return match planned.get(base) {
            Some(
                root @ (Root::Type
                | Root::Struct
                | Root::Array
                | Root::Association
                | Root::Composition),
            ) => (*root, Some(base.to_string())),
            Some(_) => (Root::Struct, None),
            None => (Root::Type, None),
        };
    }
    if definition.items.is_some() {
        (Root::Array, None)
    } else if definition.elements.is_some() {
        (Root::Struct, None)
    } else {
        (Root::Type, None)
    }
}

pub(super) fn plan(
    document: &CsnDocument,
    config: &LinkerConfig,
) -> Result<Vec<Plan>, LinkError> {
    let mut reflected: BTreeMap<&str, &Definition> = BTreeMap::new();
    for (name, definition) in &document.definitions {
        match reflection_of(definition) {
            Some(Reflection::Reflected) => {
                reflected.insert(name.as_str(), definition);
            }
            Some(Reflection::Skipped) => {
                debug!(definition = %name, kind = ?definition.kind(), "Skipping non-reflected definition");
            }
            None => {
                let kind = definition.kind().unwrap_or_default().to_string();
                if config.unknown_kinds == UnknownKindPolicy::Reject {
                    return Err(LinkError::UnsupportedKind {
                        name: name.clone(),
                        kind,
                    });
                }
                warn!(definition = %name, kind = %kind, "Skipping definition of unknown kind");
            }
        }
    }

    let resolver = Resolver {
        reflected: &reflected,
    };
    for (name, definition) in &reflected {
        resolver.check(name, definition)?;
    }

    let order = topological_order(&reflected)?;

    let mut roots: BTreeMap<String, Root> = BTreeMap::new();
    let mut effective: BTreeMap<String, Definition> = BTreeMap::new();
    let mut plans = Vec::with_capacity(order.len());
    for name in order {
        let Some(source) = reflected.get(name.as_str()) else {
            continue;
        };
        let mut definition = (*source).clone();
        merge_includes(&mut definition, &effective);
        let (root, base) = select_root(&definition, &roots);
        // Entity, event and service bases lend their properties without a prototype link.
        let inherited = named_base(&definition, &|name: &str| effective.contains_key(name))
            .map(str::to_string);
        if let Some(base_definition) = inherited.as_deref().and_then(|base| effective.get(base)) {
            inherit_missing(&mut definition, base_definition);
        }

        roots.insert(name.clone(), root);
        effective.insert(name.clone(), definition.clone());
        plans.push(Plan {
            name,
            root,
            definition,
            base,
        });
    }
    Ok(plans)
}

/// Link a document: plan, then synthesize every class against one shared model.
pub(super) fn link(
    document: &CsnDocument,
    config: &LinkerConfig,
) -> Result<LinkedModel, LinkError> {
    let plans = plan(document, config)?;

    let inner = Arc::new_cyclic(|model: &Weak<ModelInner>| {
        let mut classes: BTreeMap<String, Arc<LinkedClass>> = BTreeMap::new();
        let mut order = Vec::with_capacity(plans.len());
        for plan in plans {
            let parent = plan
                .base
                .as_ref()
                .and_then(|base| classes.get(base))
                .map(|base| Arc::clone(base.prototype_arc()))
                .unwrap_or_else(|| Arc::clone(plan.root.prototype_arc()));
            let class = LinkedClass::new(
                plan.name.clone(),
                plan.root,
                plan.definition,
                &parent,
                model.clone(),
            );
            debug!(class = %plan.name, root = %plan.root, "Linked class");
            order.push(plan.name.clone());
            classes.insert(plan.name, Arc::new(class));
        }
        ModelInner {
            namespace: document.namespace.clone(),
            classes,
            order,
        }
    });

    info!(
        classes = inner.classes.len(),
        namespace = ?inner.namespace,
        "Linked CSN model"
    );
    Ok(LinkedModel::from_inner(inner))
}

/// Resolve one element of `owner` on first access.
pub(super) fn materialize_element(
    owner: &str,
    name: &str,
    definition: &Arc<Definition>,
    model: &Weak<ModelInner>,
) -> Result<Element, ReflectError> {
    let path = format!("{}.{}", owner, name);

    let shape = if definition.is_reference() {
        let root = match definition.reference_kind() {
            Some(true) => Root::Composition,
            _ => Root::Association,
        };
        let reference =
            ReferenceDescriptor::new(owner, name, root, (**definition).clone(), model.clone())?;
        ElementShape::Reference(Arc::new(reference))
    } else if definition.elements.is_some() {
        ElementShape::Class(Arc::new(LinkedClass::new(
            path,
            Root::Struct,
            (**definition).clone(),
            Root::Struct.prototype_arc(),
            model.clone(),
        )))
    } else if definition.items.is_some() {
        ElementShape::Class(Arc::new(LinkedClass::new(
            path,
            Root::Array,
            (**definition).clone(),
            Root::Array.prototype_arc(),
            model.clone(),
        )))
    } else if let Some(type_name) = &definition.type_name {
        let inner = model.upgrade();
        let defined = inner
            .as_ref()
            .and_then(|inner| inner.classes.get(type_name).cloned());
        match (defined, builtin_type_name(type_name)) {
            (Some(class), _) if class.root().is_reference() => {
                let mut merged = (**definition).clone();
                inherit_missing(&mut merged, class.definition());
                let reference =
                    ReferenceDescriptor::new(owner, name, class.root(), merged, model.clone())?;
                ElementShape::Reference(Arc::new(reference))
            }
            (Some(class), _) => ElementShape::Class(class),
            (None, Some(builtin_name)) => ElementShape::Class(builtin().types.get(builtin_name)?),
            (None, None) if inner.is_none() => return Err(ReflectError::ModelDropped(path)),
            (None, None) => {
                return Err(LinkError::resolution(&path, type_name, "unknown type").into())
            }
        }
    } else {
        ElementShape::Untyped
    };

    Ok(Element {
        name: name.to_string(),
        definition: Arc::clone(definition),
        shape,
    })
}
