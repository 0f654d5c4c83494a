//! Shared CSN fixtures for integration tests

use csn_link::csn::CsnDocument;
use csn_link::LinkedModel;
use serde_json::json;

/// A small bookshop: aspects, derived types, mutual associations, a composition, an event and a
/// service with a projection and an action.
pub fn bookshop_document() -> CsnDocument {
    CsnDocument::from_value(json!({
        "namespace": "sap.capire.bookshop",
        "definitions": {
            "cuid": {
                "kind": "aspect",
                "elements": { "ID": { "type": "cds.UUID", "key": true } }
            },
            "managed": {
                "kind": "aspect",
                "elements": {
                    "createdAt": { "type": "cds.Timestamp" },
                    "modifiedAt": { "type": "cds.Timestamp" }
                }
            },
            "Title": { "kind": "type", "type": "cds.String", "length": 111 },
            "ShortTitle": { "kind": "type", "type": "Title" },
            "Address": {
                "kind": "type",
                "elements": {
                    "street": { "type": "cds.String" },
                    "city": { "type": "cds.String" }
                }
            },
            "Tags": { "kind": "type", "items": { "type": "cds.String" } },
            "Books": {
                "kind": "entity",
                "@title": "Books",
                "doc": "Books on offer",
                "includes": ["cuid", "managed"],
                "elements": {
                    "title": { "type": "Title" },
                    "stock": { "type": "cds.Integer" },
                    "tags": { "type": "Tags" },
                    "notes": {},
                    "author": { "type": "cds.Association", "target": "Authors" }
                }
            },
            "Authors": {
                "kind": "entity",
                "includes": ["cuid"],
                "elements": {
                    "name": { "type": "cds.String" },
                    "address": { "type": "Address" },
                    "books": {
                        "type": "cds.Association",
                        "target": "Books",
                        "cardinality": { "max": "*" },
                        "on": [{ "ref": ["books", "author"] }, "=", { "ref": ["$self"] }]
                    }
                }
            },
            "Orders": {
                "kind": "entity",
                "elements": {
                    "ID": { "type": "cds.Integer", "key": true },
                    "items": {
                        "type": "cds.Composition",
                        "target": "OrderItems",
                        "cardinality": { "max": "*" },
                        "on": [{ "ref": ["items", "parent"] }, "=", { "ref": ["$self"] }]
                    }
                }
            },
            "OrderItems": {
                "kind": "entity",
                "elements": {
                    "pos": { "type": "cds.Integer", "key": true },
                    "parent": { "type": "cds.Association", "target": "Orders" },
                    "book": {
                        "type": "cds.Association",
                        "target": "Books",
                        "keys": [{ "ref": ["ID"], "as": "book_ID" }]
                    }
                }
            },
            "OrderPlaced": {
                "kind": "event",
                "elements": { "order": { "type": "cds.Integer" } }
            },
            "CatalogService": { "kind": "service" },
            "CatalogService.Books": {
                "kind": "entity",
                "projection": { "from": { "ref": ["Books"] } },
                "elements": { "ID": { "type": "cds.UUID", "key": true } }
            },
            "CatalogService.submitOrder": {
                "kind": "action",
                "params": { "book": { "type": "cds.UUID" }, "quantity": { "type": "cds.Integer" } },
                "returns": { "type": "cds.Integer" }
            },
            "CatalogService.OrderConfirmed": {
                "kind": "event",
                "elements": { "order": { "type": "cds.Integer" } }
            },
            "bookshop": { "kind": "context" }
        }
    }))
    .unwrap()
}

pub fn bookshop() -> LinkedModel {
    LinkedModel::link(&bookshop_document()).unwrap()
}

pub fn document(definitions: serde_json::Value) -> CsnDocument {
    CsnDocument::from_value(json!({ "definitions": definitions })).unwrap()
}
