use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped document as it arrives from the search index export
pub type RawDocument = Map<String, Value>;

/// A document that conforms to the destination schema.
///
/// Every required field is present with its coerced type; fields outside the
/// schema are carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    pub id: String,
    pub title: String,
    pub language: String,
    pub preview_picture: String,
    pub content: String,
    pub content_text: String,
    pub mimetype: String,
    pub http_status: String,
    pub tags: Vec<String>,
    pub slugs: Vec<String>,
    pub all: Vec<String>,
    pub is_public: String,
    pub user_id: String,
    pub links: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalDocument {
    /// Reinterpret this document as raw input.
    pub fn into_raw(self) -> RawDocument {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => RawDocument::new(),
        }
    }

    /// Serialize as the single JSON object bound at the write boundary.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Why a document was dropped from the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingTitle,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "missing required field 'title'"),
        }
    }
}

/// A present value that had to be replaced to fit the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coercion {
    pub field: &'static str,
    pub note: String,
}

/// Outcome of normalizing one raw document
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Document {
        document: CanonicalDocument,
        coercions: Vec<Coercion>,
    },
    Skip(SkipReason),
}

impl Normalized {
    pub fn is_skip(&self) -> bool {
        matches!(self, Normalized::Skip(_))
    }

    pub fn document(&self) -> Option<&CanonicalDocument> {
        match self {
            Normalized::Document { document, .. } => Some(document),
            Normalized::Skip(_) => None,
        }
    }

    pub fn into_document(self) -> Option<CanonicalDocument> {
        match self {
            Normalized::Document { document, .. } => Some(document),
            Normalized::Skip(_) => None,
        }
    }
}
