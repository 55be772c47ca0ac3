use doc_importer::source::BatchShape;
use doc_importer::{normalize, Normalized, RawDocument};
use jsonschema::JSONSchema;
use serde_json::{json, Value};

fn compiled_schema() -> JSONSchema {
    let schema = include_str!("../schemas/canonical_document.v1.json");
    let schema_json: Value = serde_json::from_str(schema).unwrap();
    let schema_static: &'static Value = Box::leak(Box::new(schema_json));
    JSONSchema::options().compile(schema_static).unwrap()
}

/// Every document of the fixture export, including those past the row limit
fn fixture_documents() -> Vec<RawDocument> {
    let payload: Value =
        serde_json::from_str(include_str!("resources/solr_export.json")).unwrap();
    BatchShape {
        rows: usize::MAX,
        ..BatchShape::default()
    }
    .extract(payload)
    .unwrap()
}

/// Hand-picked awkward inputs
fn odd_documents() -> Vec<RawDocument> {
    [
        json!({ "title": "" }),
        json!({ "title": 7, "id": 1.5, "user_id": null }),
        json!({ "title": "T", "tags": { "a": 1 }, "all": [[1], "x"] }),
        json!({ "title": "T", "_links": "not an object", "links": { "x": 1 } }),
        json!({ "title": "T", "content": 12, "content_text": [72, 105] }),
        json!({ "title": "T", "preview_picture": null, "language": null }),
        json!({ "title": "T", "uid": null, "published_by": null }),
    ]
    .into_iter()
    .map(|v| v.as_object().cloned().unwrap())
    .collect()
}

fn all_inputs() -> Vec<RawDocument> {
    let mut docs = fixture_documents();
    docs.extend(odd_documents());
    docs
}

#[test]
fn schema_compiles_and_accepts_a_minimal_document() {
    let schema = compiled_schema();
    let document = normalize(json!({ "title": "Minimal" }).as_object().cloned().unwrap())
        .into_document()
        .unwrap();
    assert!(schema.is_valid(&serde_json::to_value(&document).unwrap()));
}

#[test]
fn titled_documents_conform_to_schema() {
    let schema = compiled_schema();
    for raw in all_inputs() {
        let titled = raw.get("title").map_or(false, |t| !t.is_null());
        match normalize(raw.clone()) {
            Normalized::Document { document, .. } => {
                assert!(titled, "untitled input produced a document: {raw:?}");
                let value = serde_json::to_value(&document).unwrap();
                assert!(schema.is_valid(&value), "schema violation for {value}");
            }
            Normalized::Skip(_) => assert!(!titled, "titled input was skipped: {raw:?}"),
        }
    }
}

#[test]
fn normalizing_a_canonical_document_is_a_no_op() {
    for raw in all_inputs() {
        let Some(first) = normalize(raw).into_document() else {
            continue;
        };
        match normalize(first.clone().into_raw()) {
            Normalized::Document { document, coercions } => {
                assert_eq!(document, first);
                assert!(coercions.is_empty(), "second pass coerced {coercions:?}");
            }
            Normalized::Skip(reason) => panic!("canonical document skipped: {reason}"),
        }
    }
}

#[test]
fn schema_rejects_forwarded_internal_keys() {
    let schema = compiled_schema();
    let document = normalize(json!({ "title": "T" }).as_object().cloned().unwrap())
        .into_document()
        .unwrap();
    let mut value = serde_json::to_value(&document).unwrap();
    assert!(schema.is_valid(&value));

    value["uid"] = json!("leaked");
    assert!(!schema.is_valid(&value), "uid must never be forwarded");
}

#[test]
fn serialized_document_keeps_quotes_intact() {
    let document = normalize(json!({ "title": "It's \"quoted\"" }).as_object().cloned().unwrap())
        .into_document()
        .unwrap();
    let text = document.to_json().unwrap();
    let back: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back["title"], "It's \"quoted\"");
}
