//! Reflection helpers seeded onto the root prototypes.

use super::Root;
use crate::capability::{CapabilitySet, Receiver};
use crate::csn::{Definition, ElementMap};
use crate::error::ReflectError;
use serde_json::Value;
use std::sync::Arc;

/// The capability sets each root starts with. Sets shared by several roots are the same `Arc`.
pub(super) struct RootSets {
    linked: Arc<CapabilitySet>,
    structured: Arc<CapabilitySet>,
    scalar: Arc<CapabilitySet>,
    array: Arc<CapabilitySet>,
    entity: Arc<CapabilitySet>,
    event: Arc<CapabilitySet>,
    reference: Arc<CapabilitySet>,
    association: Arc<CapabilitySet>,
    composition: Arc<CapabilitySet>,
    service: Arc<CapabilitySet>,
}

impl RootSets {
    pub(super) fn new() -> Self {
        RootSets {
            linked: linked().shared(),
            structured: structured().shared(),
            scalar: scalar().shared(),
            array: array().shared(),
            entity: entity().shared(),
            event: event().shared(),
            reference: reference().shared(),
            association: ownership("Association", false).shared(),
            composition: ownership("Composition", true).shared(),
            service: service().shared(),
        }
    }

    pub(super) fn for_root(&self, root: Root) -> Vec<Arc<CapabilitySet>> {
        let sets = match root {
            Root::Struct => vec![&self.linked, &self.structured],
            Root::Type => vec![&self.linked, &self.scalar],
            Root::Array => vec![&self.linked, &self.scalar, &self.array],
            Root::Event => vec![&self.linked, &self.structured, &self.event],
            Root::Entity => vec![&self.linked, &self.structured, &self.entity],
            Root::Association => vec![
                &self.linked,
                &self.scalar,
                &self.reference,
                &self.association,
            ],
            Root::Composition => vec![
                &self.linked,
                &self.scalar,
                &self.reference,
                &self.composition,
            ],
            Root::Service => vec![&self.linked, &self.service],
        };
        sets.into_iter().map(Arc::clone).collect()
    }
}

fn names<'a>(names: impl Iterator<Item = &'a str>) -> Value {
    Value::Array(names.map(Value::from).collect())
}

fn optional<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

fn payload(recv: &dyn Receiver) -> Option<&ElementMap> {
    recv.definition().and_then(Definition::payload)
}

fn string_arg<'a>(member: &str, args: &'a [Value]) -> Result<&'a str, ReflectError> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| ReflectError::InvalidArgument {
            member: member.to_string(),
            reason: "expected a string as first argument".to_string(),
        })
}

fn root_of(recv: &dyn Receiver) -> Option<Root> {
    Root::of(recv.prototype())
}

fn linked() -> CapabilitySet {
    CapabilitySet::new("linked")
        .accessor("name", |recv| optional(recv.reflected_name()))
        .accessor("root", |recv| optional(root_of(recv).map(Root::name)))
        .accessor("kind", |recv| {
            let kind = recv
                .definition()
                .and_then(Definition::kind)
                .or_else(|| root_of(recv).map(Root::name));
            optional(kind)
        })
        .method("is", |recv, args| {
            let kind = string_arg("is", args)?;
            let declared = recv.definition().and_then(Definition::kind) == Some(kind);
            let rooted = root_of(recv).map(Root::name) == Some(kind);
            Ok(Value::Bool(declared || rooted))
        })
        .method("annotation", |recv, args| {
            let name = string_arg("annotation", args)?;
            Ok(recv
                .definition()
                .and_then(|def| def.annotation(name))
                .cloned()
                .unwrap_or(Value::Null))
        })
}

fn structured() -> CapabilitySet {
    CapabilitySet::new("struct")
        .accessor("elements", |recv| {
            payload(recv)
                .map(|elements| names(elements.names()))
                .unwrap_or_else(|| Value::Array(Vec::new()))
        })
        .method("element", |recv, args| {
            let name = string_arg("element", args)?;
            match payload(recv).and_then(|elements| elements.get(name)) {
                Some(element) => serde_json::to_value(element).map_err(|err| {
                    ReflectError::InvalidArgument {
                        member: "element".to_string(),
                        reason: err.to_string(),
                    }
                }),
                None => Ok(Value::Null),
            }
        })
}

fn scalar() -> CapabilitySet {
    CapabilitySet::new("type")
        .accessor("type", |recv| {
            optional(recv.definition().and_then(|def| def.type_name.clone()))
        })
        .accessor("length", |recv| {
            optional(recv.definition().and_then(|def| def.length))
        })
        .accessor("precision", |recv| {
            optional(recv.definition().and_then(|def| def.precision))
        })
        .accessor("scale", |recv| {
            optional(recv.definition().and_then(|def| def.scale))
        })
        .accessor("enum", |recv| {
            match recv.definition().and_then(|def| def.enum_values.as_ref()) {
                Some(symbols) => names(symbols.keys().map(String::as_str)),
                None => Value::Null,
            }
        })
}

fn array() -> CapabilitySet {
    CapabilitySet::new("array").accessor("items", |recv| {
        let items = recv.definition().and_then(|def| def.items.as_deref());
        match items {
            Some(items) if items.elements.is_some() => Value::from("struct"),
            Some(items) => optional(items.type_name.clone()),
            None => Value::Null,
        }
    })
}

fn references(recv: &dyn Receiver, composition: bool) -> Value {
    match payload(recv) {
        Some(elements) => names(
            elements
                .iter()
                .filter(|(_, element)| element.reference_kind() == Some(composition))
                .map(|(name, _)| name.as_str()),
        ),
        None => Value::Array(Vec::new()),
    }
}

fn entity() -> CapabilitySet {
    CapabilitySet::new("entity")
        .accessor("keys", |recv| {
            let keys = recv.definition().map(Definition::key_names).unwrap_or_default();
            names(keys.iter().map(String::as_str))
        })
        .accessor("associations", |recv| references(recv, false))
        .accessor("compositions", |recv| references(recv, true))
        .accessor("is_projection", |recv| {
            Value::Bool(recv.definition().is_some_and(Definition::is_projection))
        })
}

fn event() -> CapabilitySet {
    CapabilitySet::new("event")
        .accessor("payload", |recv| {
            payload(recv)
                .map(|elements| names(elements.names()))
                .unwrap_or_else(|| Value::Array(Vec::new()))
        })
        .accessor("is_operation", |recv| {
            let kind = recv.definition().and_then(Definition::kind);
            Value::Bool(matches!(kind, Some("action") | Some("function")))
        })
        .accessor("returns", |recv| {
            optional(
                recv.definition()
                    .and_then(|def| def.returns.as_ref())
                    .and_then(|returns| returns.type_name.clone()),
            )
        })
}

fn reference() -> CapabilitySet {
    CapabilitySet::new("reference")
        .accessor("target", |recv| {
            optional(recv.definition().and_then(|def| def.target.clone()))
        })
        .accessor("cardinality", |recv| {
            recv.definition()
                .and_then(|def| def.cardinality.as_ref())
                .and_then(|cardinality| serde_json::to_value(cardinality).ok())
                .unwrap_or(Value::Null)
        })
        .accessor("is_to_many", |recv| {
            Value::Bool(is_to_many(recv.definition()))
        })
        .accessor("is_to_one", |recv| {
            Value::Bool(!is_to_many(recv.definition()))
        })
        .accessor("is_managed", |recv| {
            Value::Bool(recv.definition().is_some_and(|def| def.on.is_none()))
        })
        .accessor("on", |recv| {
            optional(recv.definition().and_then(|def| def.on.clone()))
        })
        .accessor("keys", |recv| match recv.definition().and_then(|def| def.keys.as_ref()) {
            Some(keys) => Value::Array(keys.iter().map(|key| Value::from(key.name())).collect()),
            None => Value::Null,
        })
}

fn is_to_many(definition: Option<&Definition>) -> bool {
    definition
        .and_then(|def| def.cardinality.as_ref())
        .is_some_and(|cardinality| cardinality.is_to_many())
}

fn ownership(label: &str, owning: bool) -> CapabilitySet {
    CapabilitySet::new(label).field("is_owning", owning)
}

fn service() -> CapabilitySet {
    CapabilitySet::new("service")
        .accessor("entities", |recv| service_members(recv, &[Root::Entity]))
        .accessor("events", |recv| service_members(recv, &[Root::Event]))
        .accessor("operations", |recv| {
            let Some(class) = recv.linked_class() else {
                return Value::Array(Vec::new());
            };
            let Some(model) = class.model() else {
                return Value::Array(Vec::new());
            };
            let prefix = format!("{}.", class.name());
            names(
                model
                    .classes()
                    .filter(|member| member.name().starts_with(&prefix))
                    .filter(|member| {
                        matches!(member.definition().kind(), Some("action") | Some("function"))
                    })
                    .map(|member| member.name()),
            )
        })
}

/// Names of the model's classes in the receiving service's namespace with one of `roots`.
fn service_members(recv: &dyn Receiver, roots: &[Root]) -> Value {
    let Some(class) = recv.linked_class() else {
        return Value::Array(Vec::new());
    };
    let Some(model) = class.model() else {
        return Value::Array(Vec::new());
    };
    let prefix = format!("{}.", class.name());
    names(
        model
            .classes()
            .filter(|member| member.name().starts_with(&prefix))
            .filter(|member| roots.contains(&member.root()))
            .filter(|member| !matches!(member.definition().kind(), Some("action") | Some("function")))
            .map(|member| member.name()),
    )
}
