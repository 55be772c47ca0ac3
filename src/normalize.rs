//! Field normalization for exported documents.
//!
//! Each raw document goes through a fixed field table. A field whose value
//! already has the canonical shape is left alone; anything else (absent,
//! null or mistyped) is replaced by the rule's fill function. Present values
//! that had to be replaced are reported as [`Coercion`]s.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::{self, DEFAULT_LANGUAGE, DEFAULT_PLACEHOLDER_IMAGE_BASE};
use crate::types::{CanonicalDocument, Coercion, Normalized, RawDocument, SkipReason};

/// Tunable defaults used by the fill rules
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    pub default_language: String,
    pub placeholder_image_base: String,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            placeholder_image_base: DEFAULT_PLACEHOLDER_IMAGE_BASE.to_string(),
        }
    }
}

type FillFn = fn(Option<Value>, &RawDocument, &NormalizerSettings) -> Value;

/// One entry of the field table
struct FieldRule {
    name: &'static str,
    /// Present values that satisfy this are kept as they are
    conforms: fn(&Value) -> bool,
    /// Produces the canonical value; receives the present non-null value if
    /// any, and the document as normalized so far
    fill: FillFn,
}

/// Applied in order: later rules may read fields settled by earlier ones.
const FIELD_TABLE: &[FieldRule] = &[
    FieldRule { name: constants::ID, conforms: Value::is_string, fill: fill_empty_text },
    FieldRule { name: constants::TITLE, conforms: Value::is_string, fill: fill_empty_text },
    FieldRule { name: constants::LANGUAGE, conforms: Value::is_string, fill: fill_language },
    FieldRule { name: constants::PREVIEW_PICTURE, conforms: Value::is_string, fill: fill_preview_picture },
    FieldRule { name: constants::CONTENT, conforms: Value::is_string, fill: fill_empty_text },
    FieldRule { name: constants::CONTENT_TEXT, conforms: is_text_or_bytes, fill: fill_content_text },
    FieldRule { name: constants::MIMETYPE, conforms: Value::is_string, fill: fill_empty_text },
    FieldRule { name: constants::HTTP_STATUS, conforms: Value::is_string, fill: fill_empty_text },
    FieldRule { name: constants::TAGS, conforms: is_text_list, fill: fill_text_list },
    FieldRule { name: constants::SLUGS, conforms: is_text_list, fill: fill_text_list },
    FieldRule { name: constants::ALL, conforms: is_text_list, fill: fill_text_list },
    FieldRule { name: constants::IS_PUBLIC, conforms: Value::is_string, fill: fill_empty_text },
    FieldRule { name: constants::USER_ID, conforms: Value::is_string, fill: fill_empty_text },
];

/// Turns raw export documents into canonical ones
#[derive(Debug, Clone, Default)]
pub struct DocumentNormalizer {
    settings: NormalizerSettings,
}

impl DocumentNormalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Normalize one document. Never fails; a document without a title is
    /// reported as [`Normalized::Skip`].
    pub fn normalize(&self, raw: RawDocument) -> Normalized {
        let mut doc = raw;

        if doc.get(constants::TITLE).map_or(true, Value::is_null) {
            return Normalized::Skip(SkipReason::MissingTitle);
        }

        let mut coercions = Vec::new();

        for rule in FIELD_TABLE {
            match doc.remove(rule.name) {
                Some(value) if (rule.conforms)(&value) => {
                    doc.insert(rule.name.to_string(), value);
                }
                other => {
                    let present = other.filter(|v| !v.is_null());
                    if let Some(value) = &present {
                        coercions.push(Coercion {
                            field: rule.name,
                            note: format!("replaced {} value", value_kind(value)),
                        });
                    }
                    let filled = (rule.fill)(present, &doc, &self.settings);
                    doc.insert(rule.name.to_string(), filled);
                }
            }
        }

        let links = take_links(&mut doc, &mut coercions);
        doc.insert(constants::LINKS.to_string(), Value::Object(links));

        for key in constants::REMOVED_KEYS {
            doc.remove(key);
        }

        decode_content_text(&mut doc, &mut coercions);

        let document = assemble(doc);
        if !coercions.is_empty() {
            debug!(id = %document.id, count = coercions.len(), "Coerced fields while normalizing");
        }
        Normalized::Document { document, coercions }
    }
}

/// Normalize with the default settings.
pub fn normalize(raw: RawDocument) -> Normalized {
    DocumentNormalizer::default().normalize(raw)
}

/// Render a scalar the way it should appear as text; null has no text form.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // compact JSON
        other => Some(other.to_string()),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_text_list(value: &Value) -> bool {
    value
        .as_array()
        .map_or(false, |items| items.iter().all(Value::is_string))
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn is_text_or_bytes(value: &Value) -> bool {
    value.is_string() || as_bytes(value).is_some()
}

fn fill_empty_text(present: Option<Value>, _: &RawDocument, _: &NormalizerSettings) -> Value {
    Value::String(present.and_then(scalar_text).unwrap_or_default())
}

fn fill_language(present: Option<Value>, _: &RawDocument, settings: &NormalizerSettings) -> Value {
    Value::String(
        present
            .and_then(scalar_text)
            .unwrap_or_else(|| settings.default_language.clone()),
    )
}

fn fill_preview_picture(
    _: Option<Value>,
    doc: &RawDocument,
    settings: &NormalizerSettings,
) -> Value {
    let title = doc.get(constants::TITLE).and_then(Value::as_str).unwrap_or_default();
    Value::String(placeholder_image_url(&settings.placeholder_image_base, title))
}

/// Placeholder image for a document: the title rendered onto a stock image.
pub fn placeholder_image_url(base: &str, title: &str) -> String {
    format!("{}{}", base, title.replace(' ', "%20"))
}

/// Absent `content_text` becomes the byte form of `content`; the decode pass
/// turns it back into text.
fn fill_content_text(present: Option<Value>, doc: &RawDocument, _: &NormalizerSettings) -> Value {
    match present {
        Some(value) => Value::String(scalar_text(value).unwrap_or_default()),
        None => {
            let content = doc.get(constants::CONTENT).and_then(Value::as_str).unwrap_or_default();
            Value::Array(content.bytes().map(Value::from).collect())
        }
    }
}

fn fill_text_list(present: Option<Value>, _: &RawDocument, _: &NormalizerSettings) -> Value {
    let items: Vec<Value> = match present {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(scalar_text)
            .map(Value::String)
            .collect(),
        Some(other) => scalar_text(other).map(Value::String).into_iter().collect(),
    };
    Value::Array(items)
}

/// `_links` wins over an existing `links`; a canonical document fed back in
/// only carries `links`.
fn take_links(doc: &mut RawDocument, coercions: &mut Vec<Coercion>) -> Map<String, Value> {
    let existing = doc.remove(constants::LINKS);
    let raw_links = doc.remove(constants::RAW_LINKS).filter(|v| !v.is_null());
    match raw_links.or(existing) {
        Some(Value::Object(links)) => links,
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            coercions.push(Coercion {
                field: constants::LINKS,
                note: format!("dropped {} link collection", value_kind(&other)),
            });
            Map::new()
        }
    }
}

fn decode_content_text(doc: &mut RawDocument, coercions: &mut Vec<Coercion>) {
    let Some(bytes) = doc.get(constants::CONTENT_TEXT).and_then(as_bytes) else {
        return;
    };
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            coercions.push(Coercion {
                field: constants::CONTENT_TEXT,
                note: format!("invalid UTF-8 ({}), decoded lossily", err.utf8_error()),
            });
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };
    doc.insert(constants::CONTENT_TEXT.to_string(), Value::String(text));
}

fn take_text(doc: &mut RawDocument, field: &str) -> String {
    match doc.remove(field) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn take_text_list(doc: &mut RawDocument, field: &str) -> Vec<String> {
    match doc.remove(field) {
        Some(Value::Array(items)) => items.into_iter().filter_map(scalar_text).collect(),
        _ => Vec::new(),
    }
}

fn take_object(doc: &mut RawDocument, field: &str) -> Map<String, Value> {
    match doc.remove(field) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn assemble(mut doc: RawDocument) -> CanonicalDocument {
    CanonicalDocument {
        id: take_text(&mut doc, constants::ID),
        title: take_text(&mut doc, constants::TITLE),
        language: take_text(&mut doc, constants::LANGUAGE),
        preview_picture: take_text(&mut doc, constants::PREVIEW_PICTURE),
        content: take_text(&mut doc, constants::CONTENT),
        content_text: take_text(&mut doc, constants::CONTENT_TEXT),
        mimetype: take_text(&mut doc, constants::MIMETYPE),
        http_status: take_text(&mut doc, constants::HTTP_STATUS),
        tags: take_text_list(&mut doc, constants::TAGS),
        slugs: take_text_list(&mut doc, constants::SLUGS),
        all: take_text_list(&mut doc, constants::ALL),
        is_public: take_text(&mut doc, constants::IS_PUBLIC),
        user_id: take_text(&mut doc, constants::USER_ID),
        links: take_object(&mut doc, constants::LINKS),
        extra: doc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawDocument {
        match value {
            Value::Object(map) => map,
            _ => panic!("test input must be an object"),
        }
    }

    fn document(value: Value) -> (CanonicalDocument, Vec<Coercion>) {
        match normalize(raw(value)) {
            Normalized::Document { document, coercions } => (document, coercions),
            Normalized::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn test_title_only_gets_all_defaults() {
        let (doc, coercions) = document(json!({ "title": "Hello World" }));

        assert_eq!(
            doc.preview_picture,
            "https://dummyimage.com/170/000/ffffff&text=Hello%20World"
        );
        assert_eq!(doc.language, "en");
        assert_eq!(doc.content, "");
        assert_eq!(doc.content_text, "");
        assert_eq!(doc.mimetype, "");
        assert_eq!(doc.http_status, "");
        assert!(doc.tags.is_empty());
        assert!(doc.slugs.is_empty());
        assert!(doc.all.is_empty());
        assert!(doc.links.is_empty());
        assert!(doc.extra.is_empty());
        assert!(coercions.is_empty());
    }

    #[test]
    fn test_numbers_become_strings() {
        let (doc, coercions) = document(json!({ "title": "T", "id": 42, "is_public": 1, "user_id": 7, "http_status": 200 }));

        assert_eq!(doc.id, "42");
        assert_eq!(doc.is_public, "1");
        assert_eq!(doc.user_id, "7");
        assert_eq!(doc.http_status, "200");
        let fields: Vec<_> = coercions.iter().map(|c| c.field).collect();
        assert_eq!(fields, vec!["id", "http_status", "is_public", "user_id"]);
    }

    #[test]
    fn test_content_text_round_trips_through_bytes() {
        let (doc, coercions) = document(json!({ "title": "T", "content": "héllo" }));
        assert_eq!(doc.content_text, "héllo");
        assert!(coercions.is_empty());
    }

    #[test]
    fn test_byte_form_content_text_is_decoded() {
        let (doc, _) = document(json!({ "title": "T", "content_text": [104, 105] }));
        assert_eq!(doc.content_text, "hi");
    }

    #[test]
    fn test_invalid_utf8_content_text_falls_back_to_lossy() {
        let (doc, coercions) = document(json!({ "title": "T", "content_text": [104, 255, 105] }));
        assert_eq!(doc.content_text, "h\u{FFFD}i");
        assert_eq!(coercions.len(), 1);
        assert_eq!(coercions[0].field, "content_text");
    }

    #[test]
    fn test_missing_or_null_title_skips() {
        assert_eq!(normalize(raw(json!({}))), Normalized::Skip(SkipReason::MissingTitle));
        assert!(normalize(raw(json!({ "title": null, "id": 1 }))).is_skip());
    }

    #[test]
    fn test_removed_keys_are_dropped_and_links_renamed() {
        let (doc, _) = document(json!({
            "title": "T",
            "_links": { "self": { "href": "/api/entries/1" } },
            "published_by": ["someone"],
            "published_at": "2020-01-01",
            "uid": "abc",
            "reading_time": 3
        }));

        assert_eq!(doc.links["self"]["href"], "/api/entries/1");
        let value = serde_json::to_value(&doc).unwrap();
        for key in ["_links", "published_by", "published_at", "uid"] {
            assert!(value.get(key).is_none(), "{key} should be removed");
        }
        assert_eq!(value["reading_time"], 3);
    }

    #[test]
    fn test_null_raw_links_keep_existing_links() {
        let (doc, coercions) = document(json!({ "title": "T", "_links": null, "links": { "a": 1 } }));
        assert_eq!(doc.links["a"], 1);
        assert!(coercions.is_empty());
    }

    #[test]
    fn test_present_values_are_left_alone() {
        let input = json!({
            "id": "9",
            "title": "Kept",
            "language": "fr",
            "preview_picture": "https://example.com/p.png",
            "content": "<p>x</p>",
            "content_text": "x",
            "mimetype": "text/html",
            "http_status": "200",
            "tags": ["a"],
            "slugs": ["b"],
            "all": ["c"],
            "is_public": "false",
            "user_id": "3"
        });
        let (doc, coercions) = document(input);
        assert_eq!(doc.language, "fr");
        assert_eq!(doc.preview_picture, "https://example.com/p.png");
        assert_eq!(doc.content_text, "x");
        assert_eq!(doc.tags, vec!["a"]);
        assert!(coercions.is_empty());
    }

    #[test]
    fn test_wrong_shape_lists_are_repaired() {
        let (doc, coercions) = document(json!({
            "title": "T",
            "tags": "solo",
            "slugs": [1, null, "two"],
            "all": { "k": "v" }
        }));
        assert_eq!(doc.tags, vec!["solo"]);
        assert_eq!(doc.slugs, vec!["1", "two"]);
        assert_eq!(doc.all, vec![r#"{"k":"v"}"#]);
        assert_eq!(coercions.len(), 3);
    }

    #[test]
    fn test_settings_change_defaults() {
        let normalizer = DocumentNormalizer::new(NormalizerSettings {
            default_language: "de".to_string(),
            placeholder_image_base: "https://img.test/?t=".to_string(),
        });
        let doc = normalizer
            .normalize(raw(json!({ "title": "A B" })))
            .into_document()
            .unwrap();
        assert_eq!(doc.language, "de");
        assert_eq!(doc.preview_picture, "https://img.test/?t=A%20B");
    }

    #[test]
    fn test_normalizing_twice_changes_nothing() {
        let (first, _) = document(json!({
            "title": "Twice",
            "id": 5,
            "content": "body",
            "_links": { "self": "x" },
            "tags": "one",
            "uid": "u"
        }));
        let again = normalize(first.clone().into_raw());
        assert_eq!(again.into_document(), Some(first));
    }
}
