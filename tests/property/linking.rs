//! Property-based tests for linking

use csn_link::capability::Reflect;
use csn_link::csn::CsnDocument;
use csn_link::{LinkError, LinkedModel, Root};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// A chain of struct types, each embedding the next by value; optionally closed into a cycle.
fn struct_chain(len: usize, closed: bool) -> CsnDocument {
    let mut definitions = Map::new();
    for i in 0..len {
        let next = if i + 1 < len {
            Some(format!("S{}", i + 1))
        } else if closed {
            Some("S0".to_string())
        } else {
            None
        };
        let mut elements = Map::new();
        elements.insert("value".to_string(), json!({ "type": "cds.Integer" }));
        if let Some(next) = next {
            elements.insert("next".to_string(), json!({ "type": next }));
        }
        definitions.insert(
            format!("S{}", i),
            json!({ "kind": "type", "elements": Value::Object(elements) }),
        );
    }
    CsnDocument::from_value(json!({ "definitions": Value::Object(definitions) })).unwrap()
}

/// Open chains link with every dependency before its dependent; closed chains are rejected
#[test]
fn test_struct_chains_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1usize..12, any::<bool>()), |(len, closed)| {
            let doc = struct_chain(len, closed);
            match LinkedModel::link(&doc) {
                Ok(model) => {
                    prop_assert!(!closed);
                    let names: Vec<_> = model.names().collect();
                    for i in 0..len.saturating_sub(1) {
                        let here = format!("S{}", i);
                        let next = format!("S{}", i + 1);
                        let pos = |name: &str| names.iter().position(|n| *n == name);
                        prop_assert!(pos(&next) < pos(&here));
                    }
                    for class in model.classes() {
                        prop_assert_eq!(class.root(), Root::Struct);
                        prop_assert!(class.is_instance_of(&Root::Struct));
                        prop_assert!(!class.is_instance_of(&Root::Entity));
                    }
                }
                Err(LinkError::CyclicStruct { cycle }) => {
                    prop_assert!(closed);
                    prop_assert_eq!(cycle.first(), cycle.last());
                    prop_assert_eq!(cycle.len(), len + 1);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
            Ok(())
        })
        .unwrap();
}
