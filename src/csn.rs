//! Core Schema Notation (CSN) document model.
//!
//! The linker treats these types as already-validated input. Only the parts of CSN the linked model
//! reflects are typed; everything else (annotations included) is kept in [`Definition::extra`].

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

mod elements;

pub use elements::ElementMap;

/// Scalar types every CSN document may reference without defining them.
pub const BUILTIN_SCALARS: &[&str] = &[
    "cds.UUID",
    "cds.Boolean",
    "cds.UInt8",
    "cds.Int16",
    "cds.Int32",
    "cds.Integer",
    "cds.Int64",
    "cds.Integer64",
    "cds.Decimal",
    "cds.Double",
    "cds.Date",
    "cds.Time",
    "cds.DateTime",
    "cds.Timestamp",
    "cds.String",
    "cds.LargeString",
    "cds.Binary",
    "cds.LargeBinary",
    "cds.Vector",
    "cds.Map",
];

pub const ASSOCIATION_TYPE: &str = "cds.Association";
pub const COMPOSITION_TYPE: &str = "cds.Composition";

/// Canonical `cds.` name of a built-in type, accepting unqualified spellings.
pub fn builtin_type_name(name: &str) -> Option<&'static str> {
    let qualified = if name.starts_with("cds.") {
        name.to_string()
    } else {
        format!("cds.{}", name)
    };
    BUILTIN_SCALARS
        .iter()
        .chain([ASSOCIATION_TYPE, COMPOSITION_TYPE].iter())
        .find(|builtin| **builtin == qualified)
        .copied()
}

/// A CSN document: a flat map of fully-qualified names to definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsnDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub definitions: BTreeMap<String, Definition>,

    #[serde(rename = "$version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CsnDocument {
    /// Parse a document from CSN JSON.
    pub fn from_json(json: &str) -> Result<Self, LinkError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a document from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, LinkError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }
}

/// One named definition, or one element of a structured definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<ElementMap>,

    /// Parameters of actions and functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ElementMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Definition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Box<Definition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<ForeignKey>>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub key: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Value>,

    /// Annotations (`@...`) and any properties not modelled above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Definition {
    /// Definition of the given kind with no other properties.
    pub fn of_kind(kind: &str) -> Self {
        Definition {
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    /// Element typed with the given type name.
    pub fn typed(type_name: &str) -> Self {
        Definition {
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }
    }

    /// Managed association element to `target`.
    pub fn association(target: &str) -> Self {
        Definition {
            type_name: Some(ASSOCIATION_TYPE.to_string()),
            target: Some(target.to_string()),
            ..Default::default()
        }
    }

    /// Composition element to `target`.
    pub fn composition(target: &str) -> Self {
        Definition {
            type_name: Some(COMPOSITION_TYPE.to_string()),
            target: Some(target.to_string()),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Whether this node is an Association or Composition.
    pub fn is_reference(&self) -> bool {
        self.target.is_some() || self.reference_kind().is_some()
    }

    /// `Some(true)` for compositions, `Some(false)` for associations, `None` otherwise.
    pub fn reference_kind(&self) -> Option<bool> {
        let explicit = self.type_name.as_deref().or(self.kind.as_deref());
        match explicit {
            Some("cds.Composition") | Some("Composition") => Some(true),
            Some("cds.Association") | Some("Association") => Some(false),
            _ if self.target.is_some() => Some(false),
            _ => None,
        }
    }

    /// Whether this entity is defined by a query rather than its own elements.
    pub fn is_projection(&self) -> bool {
        self.query.is_some() || self.projection.is_some()
    }

    /// Annotations in key order, names including the leading `@`.
    pub fn annotations(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.extra.iter().filter(|(name, _)| name.starts_with('@'))
    }

    pub fn annotation(&self, name: &str) -> Option<&Value> {
        if name.starts_with('@') {
            self.extra.get(name)
        } else {
            self.extra.get(&format!("@{}", name))
        }
    }

    /// Names of elements flagged as keys, in declaration order.
    pub fn key_names(&self) -> Vec<String> {
        self.elements
            .iter()
            .flat_map(|elements| elements.iter())
            .filter(|(_, element)| element.key)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Structured payload: `elements`, or `params` for operations.
    pub fn payload(&self) -> Option<&ElementMap> {
        self.elements.as_ref().or(self.params.as_ref())
    }
}

/// Cardinality of an association or composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cardinality {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<CardinalityMax>,
}

/// Upper bound of a cardinality: a count or `"*"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardinalityMax {
    Count(u64),
    Symbol(String),
}

impl Cardinality {
    pub fn to_many() -> Self {
        Cardinality {
            max: Some(CardinalityMax::Symbol("*".to_string())),
            ..Default::default()
        }
    }

    pub fn is_to_many(&self) -> bool {
        match &self.max {
            Some(CardinalityMax::Count(n)) => *n > 1,
            Some(CardinalityMax::Symbol(symbol)) => symbol == "*",
            None => false,
        }
    }
}

/// Foreign key of a managed association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(rename = "ref")]
    pub path: Vec<String>,

    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ForeignKey {
    /// Name the key is exposed as: the alias, or the joined path.
    pub fn name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.path.join("_"))
    }
}
