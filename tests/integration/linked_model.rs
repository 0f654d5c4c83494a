//! Integration tests for linking CSN documents into reflected models

use super::test_utils::{bookshop, document};
use csn_link::capability::Reflect;
use csn_link::linked::{ElementShape, LinkerConfig, UnknownKindPolicy};
use csn_link::{builtin, LinkError, LinkedModel, Root};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_every_class_has_exactly_one_root() {
    let model = bookshop();
    for class in model.classes() {
        let roots: Vec<Root> = Root::ALL
            .into_iter()
            .filter(|root| class.is_instance_of(root))
            .collect();
        assert_eq!(roots, vec![class.root()], "{}", class.name());
    }
}

#[test]
fn test_roots_follow_definition_kinds() {
    let model = bookshop();
    let root_of = |name: &str| model.class(name).unwrap().root();

    assert_eq!(root_of("Books"), Root::Entity);
    assert_eq!(root_of("cuid"), Root::Struct);
    assert_eq!(root_of("Address"), Root::Struct);
    assert_eq!(root_of("Title"), Root::Type);
    assert_eq!(root_of("Tags"), Root::Array);
    assert_eq!(root_of("OrderPlaced"), Root::Event);
    assert_eq!(root_of("CatalogService"), Root::Service);
    assert_eq!(root_of("CatalogService.submitOrder"), Root::Event);
    assert!(model.class("bookshop").is_none());
}

#[test]
fn test_includes_merge_aspect_elements_first() {
    let model = bookshop();
    let books = model.class("Books").unwrap();
    let names: Vec<_> = books.element_names().collect();
    assert_eq!(
        names,
        vec!["ID", "createdAt", "modifiedAt", "title", "stock", "tags", "notes", "author"]
    );
    assert_eq!(books.keys(), vec!["ID"]);
    assert_eq!(books.get("keys"), Some(json!(["ID"])));
}

#[test]
fn test_elements_resolve_lazily_and_once() {
    let model = bookshop();
    let books = model.class("Books").unwrap();
    assert!(!books.elements().is_resolved("author"));

    let first = books.element("author").unwrap();
    assert!(books.elements().is_resolved("author"));
    let second = books.element("author").unwrap();
    assert!(Arc::ptr_eq(
        first.reference().unwrap(),
        second.reference().unwrap()
    ));
    assert!(!books.elements().is_resolved("title"));
}

#[test]
fn test_mutual_associations_link_both_ways() {
    let model = bookshop();
    let authors = model.target_of("Books", "author").unwrap();
    assert!(Arc::ptr_eq(&authors, model.class("Authors").unwrap()));

    let books = model.target_of("Authors", "books").unwrap();
    assert!(Arc::ptr_eq(&books, model.class("Books").unwrap()));

    let back = authors.element("books").unwrap();
    let reference = back.reference().unwrap();
    assert!(reference.is_to_many());
    assert!(!reference.is_managed());
    assert_eq!(reference.get("target"), Some(json!("Books")));
    assert_eq!(reference.get("is_owning"), Some(json!(false)));
}

#[test]
fn test_composition_elements_are_composition_references() {
    let model = bookshop();
    let items = model.class("Orders").unwrap().element("items").unwrap();
    let reference = items.reference().unwrap();

    assert!(reference.is_composition());
    assert!(reference.is_instance_of(&Root::Composition));
    assert!(!reference.is_instance_of(&Root::Association));
    assert_eq!(reference.get("is_owning"), Some(json!(true)));
    assert_eq!(reference.get("name"), Some(json!("Orders.items")));
    assert_eq!(model.class("Orders").unwrap().get("compositions"), Some(json!(["items"])));
}

#[test]
fn test_foreign_keys() {
    let model = bookshop();
    let items = model.class("OrderItems").unwrap();

    let parent = items.element("parent").unwrap();
    assert_eq!(parent.reference().unwrap().foreign_keys().unwrap(), vec!["ID"]);

    let book = items.element("book").unwrap();
    assert_eq!(book.reference().unwrap().foreign_keys().unwrap(), vec!["book_ID"]);
}

#[test]
fn test_named_and_builtin_element_types() {
    let model = bookshop();
    let authors = model.class("Authors").unwrap();

    let address = authors.element("address").unwrap();
    assert!(Arc::ptr_eq(address.class().unwrap(), model.class("Address").unwrap()));

    let name = authors.element("name").unwrap();
    let string = builtin().types.get("cds.String").unwrap();
    assert!(Arc::ptr_eq(name.class().unwrap(), &string));
    assert!(name.class().unwrap().is_instance_of(&Root::Type));

    let books = model.class("Books").unwrap();
    assert!(matches!(books.element("notes").unwrap().shape(), ElementShape::Untyped));
    assert_eq!(books.element("tags").unwrap().class().unwrap().root(), Root::Array);
}

#[test]
fn test_derived_types_extend_their_base() {
    let model = bookshop();
    let title = model.class("Title").unwrap();
    let short = model.class("ShortTitle").unwrap();

    assert!(Arc::ptr_eq(short.base().unwrap(), title.prototype_arc()));
    assert!(short.is_instance_of(&**title));
    assert!(short.is_instance_of(&Root::Type));
    assert_eq!(short.get("length"), Some(json!(111)));
}

#[test]
fn test_document_types_win_over_unqualified_builtin_names() {
    let model = LinkedModel::link(&document(json!({
        "Events": {
            "kind": "entity",
            "elements": {
                "ID": { "type": "cds.Integer", "key": true },
                "when": { "type": "Date" },
                "created": { "type": "cds.Date" }
            }
        },
        "Date": {
            "kind": "type",
            "elements": { "day": { "type": "Integer" }, "month": { "type": "Integer" } }
        }
    })))
    .unwrap();

    let date = model.class("Date").unwrap();
    let when = model.class("Events").unwrap().element("when").unwrap();
    assert!(Arc::ptr_eq(when.class().unwrap(), date));
    assert_eq!(when.class().unwrap().root(), Root::Struct);

    let created = model.class("Events").unwrap().element("created").unwrap();
    assert_eq!(created.class().unwrap().name(), "cds.Date");

    let day = date.element("day").unwrap();
    assert_eq!(day.class().unwrap().name(), "cds.Integer");

    let order: Vec<_> = model.names().collect();
    assert_eq!(order, vec!["Date", "Events"]);
}

#[test]
fn test_types_derived_from_entities_copy_their_elements() {
    let model = LinkedModel::link(&document(json!({
        "Books": {
            "kind": "entity",
            "elements": {
                "ID": { "type": "cds.Integer", "key": true },
                "title": { "type": "cds.String" }
            }
        },
        "BookRef": { "kind": "type", "type": "Books" }
    })))
    .unwrap();

    let book_ref = model.class("BookRef").unwrap();
    assert_eq!(book_ref.root(), Root::Struct);
    assert!(Arc::ptr_eq(book_ref.base().unwrap(), Root::Struct.prototype_arc()));
    assert!(!book_ref.is_instance_of(&**model.class("Books").unwrap()));
    assert_eq!(book_ref.element_names().collect::<Vec<_>>(), vec!["ID", "title"]);
    assert_eq!(book_ref.get("elements"), Some(json!(["ID", "title"])));
}

#[test]
fn test_annotations_and_doc_are_fields() {
    let model = bookshop();
    let books = model.class("Books").unwrap();
    assert_eq!(books.get("@title"), Some(json!("Books")));
    assert_eq!(books.call("annotation", &[json!("title")]).unwrap(), json!("Books"));
    assert_eq!(books.get("doc"), Some(json!("Books on offer")));
}

#[test]
fn test_service_helpers() {
    let model = bookshop();
    let service = model.class("CatalogService").unwrap();
    assert_eq!(service.get("entities"), Some(json!(["CatalogService.Books"])));
    assert_eq!(service.get("events"), Some(json!(["CatalogService.OrderConfirmed"])));
    assert_eq!(service.get("operations"), Some(json!(["CatalogService.submitOrder"])));

    let action = model.class("CatalogService.submitOrder").unwrap();
    assert_eq!(action.get("is_operation"), Some(json!(true)));
    assert_eq!(action.get("payload"), Some(json!(["book", "quantity"])));
    assert_eq!(action.get("returns"), Some(json!("cds.Integer")));
    assert_eq!(action.call("is", &[json!("event")]).unwrap(), json!(true));

    let projection = model.class("CatalogService.Books").unwrap();
    assert_eq!(projection.get("is_projection"), Some(json!(true)));
}

#[test]
fn test_instances_of_linked_classes() {
    let model = bookshop();
    let books = model.class("Books").unwrap();
    let book = books.new_instance(Some(json!({ "title": "Wuthering Heights" })));

    assert_eq!(book.get("title"), Some(json!("Wuthering Heights")));
    assert_eq!(book.get("keys"), Some(json!(["ID"])));
    assert!(book.is_instance_of(&**books));
    assert!(book.is_instance_of(&Root::Entity));
    assert!(!book.is_instance_of(&Root::Association));
    assert!(!book.is_instance_of(&**model.class("Authors").unwrap()));
}

#[test]
fn test_cyclic_struct_nesting_is_rejected() {
    let doc = document(json!({
        "A": { "kind": "type", "elements": { "b": { "type": "B" } } },
        "B": { "kind": "type", "elements": { "a": { "type": "A" } } }
    }));
    match LinkedModel::link(&doc) {
        Err(LinkError::CyclicStruct { cycle }) => assert_eq!(cycle, vec!["A", "B", "A"]),
        other => panic!("expected a cyclic struct error, got {:?}", other),
    }
}

#[test]
fn test_arrays_break_value_cycles() {
    let doc = document(json!({
        "Node": {
            "kind": "type",
            "elements": {
                "label": { "type": "cds.String" },
                "children": { "items": { "type": "Node" } }
            }
        }
    }));
    let model = LinkedModel::link(&doc).unwrap();
    let children = model.class("Node").unwrap().element("children").unwrap();
    assert_eq!(children.class().unwrap().root(), Root::Array);
    assert_eq!(children.class().unwrap().get("items"), Some(json!("Node")));
}

#[test]
fn test_unresolvable_references_fail_the_build() {
    let missing_target = document(json!({
        "Books": { "kind": "entity", "elements": {
            "author": { "type": "cds.Association", "target": "Authors" }
        } }
    }));
    assert!(matches!(
        LinkedModel::link(&missing_target),
        Err(LinkError::Resolution { ref reference, .. }) if reference == "Authors"
    ));

    let non_entity_target = document(json!({
        "Title": { "kind": "type", "type": "cds.String" },
        "Books": { "kind": "entity", "elements": {
            "title": { "type": "cds.Association", "target": "Title" }
        } }
    }));
    assert!(matches!(
        LinkedModel::link(&non_entity_target),
        Err(LinkError::Resolution { ref reason, .. }) if reason == "target is not an entity"
    ));

    let unknown_type = document(json!({
        "Books": { "kind": "entity", "elements": { "price": { "type": "Money" } } }
    }));
    assert!(matches!(
        LinkedModel::link(&unknown_type),
        Err(LinkError::Resolution { ref from, .. }) if from == "Books.price"
    ));

    let unknown_aspect = document(json!({
        "Books": { "kind": "entity", "includes": ["managed"] }
    }));
    assert!(LinkedModel::link(&unknown_aspect).is_err());
}

#[test]
fn test_unknown_kinds_follow_linker_policy() {
    let doc = document(json!({
        "Books": { "kind": "entity" },
        "Widget": { "kind": "widget" }
    }));

    let lenient = LinkedModel::link(&doc).unwrap();
    assert_eq!(lenient.names().collect::<Vec<_>>(), vec!["Books"]);

    let strict = LinkerConfig {
        unknown_kinds: UnknownKindPolicy::Reject,
    };
    assert!(matches!(
        LinkedModel::link_with(&doc, &strict),
        Err(LinkError::UnsupportedKind { ref kind, .. }) if kind == "widget"
    ));
}

#[test]
fn test_link_order_puts_value_dependencies_first() {
    let model = bookshop();
    let names: Vec<_> = model.names().collect();
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("cuid") < position("Books"));
    assert!(position("Title") < position("ShortTitle"));
    assert!(position("Address") < position("Authors"));
}
