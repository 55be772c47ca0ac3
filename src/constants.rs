/// Field names of the canonical document schema
pub const ID: &str = "id";
pub const TITLE: &str = "title";
pub const LANGUAGE: &str = "language";
pub const PREVIEW_PICTURE: &str = "preview_picture";
pub const CONTENT: &str = "content";
pub const CONTENT_TEXT: &str = "content_text";
pub const MIMETYPE: &str = "mimetype";
pub const HTTP_STATUS: &str = "http_status";
pub const TAGS: &str = "tags";
pub const SLUGS: &str = "slugs";
pub const ALL: &str = "all";
pub const IS_PUBLIC: &str = "is_public";
pub const USER_ID: &str = "user_id";
pub const LINKS: &str = "links";

/// Link collection key as it arrives from the export; renamed to `links`
pub const RAW_LINKS: &str = "_links";

/// Keys dropped from every document before it is written
pub const REMOVED_KEYS: [&str; 4] = [RAW_LINKS, "published_by", "published_at", "uid"];

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_PLACEHOLDER_IMAGE_BASE: &str = "https://dummyimage.com/170/000/ffffff&text=";

// Source defaults
pub const DEFAULT_DOCS_POINTER: &str = "/response/docs";
pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

// Target defaults
pub const DEFAULT_CONFIG_PATH: &str = "doc_importer.toml";
pub const DEFAULT_DATABASE_PATH: &str = "doc_importer.db";
pub const DEFAULT_KEYSPACE: &str = "documents";
pub const DEFAULT_TABLE: &str = "entries";

/// Placeholders substituted in DDL templates
pub const KEYSPACE_PLACEHOLDER: &str = "keyspace_name";
pub const TABLE_PLACEHOLDER: &str = "table_name";
