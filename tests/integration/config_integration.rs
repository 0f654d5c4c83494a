//! Integration tests for configuration driving linking and extension

use super::test_utils::document;
use csn_link::capability::{CapabilitySet, ConflictPolicy};
use csn_link::config::{ConfigLoader, ReflectConfig};
use csn_link::linked::{DocumentLoader, UnknownKindPolicy};
use csn_link::lazy::ModuleLoader;
use csn_link::{LinkError, LinkedModel, ReflectError};
use serde_json::json;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("csn-link.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_config_file_drives_linker_and_extension_policy() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[extension]
conflict_policy = "strict"

[linker]
unknown_kinds = "reject"
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.linker.unknown_kinds, UnknownKindPolicy::Reject);

    let doc = document(json!({
        "Books": { "kind": "entity" },
        "Gadget": { "kind": "gadget" }
    }));
    assert!(matches!(
        LinkedModel::link_with(&doc, &config.linker),
        Err(LinkError::UnsupportedKind { .. })
    ));

    let model = LinkedModel::link(&document(json!({ "Books": { "kind": "entity" } }))).unwrap();
    let books = model.class("Books").unwrap();
    config
        .extend(&**books)
        .with([CapabilitySet::new("first").field("it_m", 1).shared()])
        .unwrap();
    let clash = config
        .extend(&**books)
        .with([CapabilitySet::new("second").field("it_m", 2).shared()]);
    assert!(matches!(clash, Err(ReflectError::Conflict { .. })));
}

#[test]
fn test_document_loader_uses_configured_linker() {
    let mut config = ReflectConfig::default();
    config.linker.unknown_kinds = UnknownKindPolicy::Reject;

    let doc = document(json!({ "Thing": { "kind": "thing" } }));
    let loader = DocumentLoader::new(config.linker.clone()).document("things", doc);
    assert!(matches!(
        loader.load("things"),
        Err(ReflectError::Link(LinkError::UnsupportedKind { .. }))
    ));
}

#[test]
fn test_invalid_config_values_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let bad_policy = write_config(&temp_dir, "[extension]\nconflict_policy = \"sometimes\"\n");
    assert!(matches!(
        ConfigLoader::load_from_file(&bad_policy),
        Err(ReflectError::ConfigError(_))
    ));

    let bad_logging = write_config(&temp_dir, "[logging]\nformat = \"xml\"\n");
    let config = ConfigLoader::load_from_file(&bad_logging).unwrap();
    assert_eq!(config.extension.conflict_policy, ConflictPolicy::Silent);
    assert_eq!(config.validate().unwrap_err().len(), 1);
}
