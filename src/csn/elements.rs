//! Ordered element maps.
//!
//! CSN element order is significant (it is the column order of entities and the field order of
//! structs), so elements are kept as an ordered list rather than a sorted map.

use super::Definition;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementMap {
    entries: Vec<(String, Definition)>,
}

impl ElementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element, replacing an existing one of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, element: Definition) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = element,
            None => self.entries.push((name, element)),
        }
    }

    /// Builder-style [`ElementMap::insert`].
    pub fn with(mut self, name: impl Into<String>, element: Definition) -> Self {
        self.insert(name, element);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, element)| element)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Definition)> {
        self.entries.iter().map(|(name, element)| (name, element))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Definition)> for ElementMap {
    fn from_iter<I: IntoIterator<Item = (String, Definition)>>(iter: I) -> Self {
        let mut map = ElementMap::new();
        for (name, element) in iter {
            map.insert(name, element);
        }
        map
    }
}

impl Serialize for ElementMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, element) in &self.entries {
            map.serialize_entry(name, element)?;
        }
        map.end()
    }
}

struct ElementMapVisitor;

impl<'de> Visitor<'de> for ElementMapVisitor {
    type Value = ElementMap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of element names to definitions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ElementMap, A::Error> {
        let mut map = ElementMap::new();
        while let Some((name, element)) = access.next_entry::<String, Definition>()? {
            map.insert(name, element);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for ElementMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ElementMapVisitor)
    }
}
