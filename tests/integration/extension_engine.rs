//! Integration tests for capability composition

use super::test_utils::bookshop;
use csn_link::capability::{
    extend, CapabilitySet, ConflictPolicy, Extensible, Member, Prototype, Receiver, Reflect,
};
use csn_link::{ReflectError, Root};
use serde_json::{json, Value};

fn field(proto: &Prototype, name: &str) -> Option<Value> {
    match proto.lookup(name)? {
        Member::Field(value) => Some(value),
        _ => None,
    }
}

#[test]
fn test_root_extension_reaches_existing_classes_and_references() {
    let model = bookshop();
    let books = model.class("Books").unwrap();
    let author = books.element("author").unwrap();

    let set = CapabilitySet::new("labels")
        .accessor("it_label", |recv: &dyn Receiver| {
            Value::from(recv.reflected_name().unwrap_or("?").to_uppercase())
        })
        .shared();
    extend(&Root::Entity).with([set.clone()]).unwrap();
    extend(&Root::Association).with([set]).unwrap();

    assert_eq!(books.get("it_label"), Some(json!("BOOKS")));
    assert_eq!(
        author.reference().unwrap().get("it_label"),
        Some(json!("BOOKS.AUTHOR"))
    );
    assert_eq!(model.class("Title").unwrap().get("it_label"), None);
}

#[test]
fn test_shared_set_is_one_object_on_every_root() {
    let set = CapabilitySet::new("shared").field("it_shared_marker", 1).shared();
    extend(&Root::Event).with([set.clone()]).unwrap();
    extend(&Root::Service).with([set.clone()]).unwrap();

    assert!(Root::Event.prototype().has_applied(&set));
    assert!(Root::Service.prototype().has_applied(&set));
    assert!(!Root::Type.prototype().has_applied(&set));
}

#[test]
fn test_last_applied_wins_and_reapplication_moves_to_newest() {
    let target = Prototype::base("Target");
    let a = CapabilitySet::new("a").field("m", "a").shared();
    let b = CapabilitySet::new("b").field("m", "b").shared();

    extend(&target).with([a.clone(), b.clone()]).unwrap();
    assert_eq!(field(&target, "m"), Some(json!("b")));

    extend(&target).with([a.clone()]).unwrap();
    assert_eq!(field(&target, "m"), Some(json!("a")));

    let labels: Vec<_> = target.applied().iter().map(|set| set.label().to_string()).collect();
    assert_eq!(labels, vec!["b", "a"]);
}

#[test]
fn test_strict_policy_is_all_or_nothing() {
    let target = Prototype::base("Strict");
    extend(&target)
        .with([CapabilitySet::new("base").field("m", 1).shared()])
        .unwrap();

    let result = extend(&target).policy(ConflictPolicy::Strict).with([
        CapabilitySet::new("fresh").field("n", 2).shared(),
        CapabilitySet::new("clash").field("m", 3).shared(),
    ]);

    match result {
        Err(ReflectError::Conflict { member, incoming, existing, .. }) => {
            assert_eq!(member, "m");
            assert_eq!(incoming, "clash");
            assert_eq!(existing, "base");
        }
        other => panic!("expected conflict, got {:?}", other.map(|_| ())),
    }
    assert_eq!(field(&target, "n"), None);
    assert_eq!(field(&target, "m"), Some(json!(1)));
}

#[test]
fn test_strict_policy_allows_reapplying_the_same_set() {
    let target = Prototype::base("Reapply");
    let set = CapabilitySet::new("only").field("m", 1).shared();
    extend(&target).with([set.clone()]).unwrap();
    extend(&target)
        .policy(ConflictPolicy::Strict)
        .with([set])
        .unwrap();
    assert_eq!(target.applied().len(), 1);
}

#[test]
fn test_warn_policy_still_applies() {
    let target = Prototype::base("Warned");
    extend(&target)
        .with([CapabilitySet::new("first").field("m", 1).shared()])
        .unwrap();
    extend(&target)
        .policy(ConflictPolicy::Warn)
        .with([CapabilitySet::new("second").field("m", 2).shared()])
        .unwrap();
    assert_eq!(field(&target, "m"), Some(json!(2)));
}

#[test]
fn test_methods_receive_the_looked_up_object() {
    let model = bookshop();
    let authors = model.class("Authors").unwrap();
    extend(&**authors)
        .with([CapabilitySet::new("greeting")
            .method("greet", |recv, args| {
                let who = args.first().and_then(Value::as_str).unwrap_or("nobody");
                Ok(Value::from(format!(
                    "{} greets {}",
                    recv.reflected_name().unwrap_or("?"),
                    who
                )))
            })
            .shared()])
        .unwrap();

    let author = authors.new_instance(None);
    assert_eq!(
        author.call("greet", &[json!("readers")]).unwrap(),
        json!("Authors greets readers")
    );
    assert!(author.responds_to("greet"));
    assert!(matches!(author.call("name", &[]), Err(ReflectError::NotCallable(_))));
    assert!(matches!(author.call("nope", &[]), Err(ReflectError::MemberNotFound(_))));

    let books = model.class("Books").unwrap();
    assert!(!books.responds_to("greet"));
}

#[test]
fn test_class_extension_does_not_leak_to_siblings_or_root() {
    let model = bookshop();
    let orders = model.class("Orders").unwrap();
    extend(&**orders)
        .with([CapabilitySet::new("orders-only").field("it_orders_only", true).shared()])
        .unwrap();

    assert_eq!(orders.new_instance(None).get("it_orders_only"), Some(json!(true)));
    assert_eq!(model.class("OrderItems").unwrap().get("it_orders_only"), None);
    assert_eq!(Root::Entity.construct(None).get("it_orders_only"), None);
}

#[test]
fn test_strict_policy_guards_members_inherited_from_the_root() {
    let model = bookshop();
    let books = model.class("Books").unwrap();
    let applied = books.prototype().applied().len();
    let result = extend(&**books)
        .policy(ConflictPolicy::Strict)
        .with([CapabilitySet::new("custom-keys").field("keys", json!(["isbn"])).shared()]);

    assert!(matches!(result, Err(ReflectError::Conflict { ref member, .. }) if member == "keys"));
    assert_eq!(books.get("keys"), Some(json!(["ID"])));
    assert_eq!(books.prototype().applied().len(), applied);
}
