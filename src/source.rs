use crate::constants::{DEFAULT_DOCS_POINTER, DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_ROWS};
use crate::error::{ImporterError, Result};
use crate::types::RawDocument;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Loads one bounded, ordered batch of raw documents
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Short description of where documents come from, for logs
    fn describe(&self) -> String;

    async fn read_batch(&self) -> Result<Vec<RawDocument>>;
}

/// Where the document array sits inside the export and how much of it to take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchShape {
    /// JSON pointer to the document array; a bare top-level array is accepted too
    pub docs_pointer: String,
    pub rows: usize,
}

impl Default for BatchShape {
    fn default() -> Self {
        Self {
            docs_pointer: DEFAULT_DOCS_POINTER.to_string(),
            rows: DEFAULT_ROWS,
        }
    }
}

impl BatchShape {
    /// Pull the document array out of an export payload and bound it to `rows`.
    pub fn extract(&self, payload: Value) -> Result<Vec<RawDocument>> {
        let docs = match payload {
            Value::Array(items) => items,
            mut envelope => match envelope.pointer_mut(&self.docs_pointer).map(Value::take) {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(ImporterError::Source {
                        message: format!(
                            "expected an array at '{}', found {}",
                            self.docs_pointer,
                            kind(&other)
                        ),
                    })
                }
                None => {
                    return Err(ImporterError::Source {
                        message: format!("no document array at '{}'", self.docs_pointer),
                    })
                }
            },
        };

        docs.into_iter()
            .take(self.rows)
            .enumerate()
            .map(|(i, doc)| match doc {
                Value::Object(map) => Ok(map),
                other => Err(ImporterError::Source {
                    message: format!("document {} is {}, not an object", i, kind(&other)),
                }),
            })
            .collect()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads an export saved to disk
pub struct FileSource {
    path: PathBuf,
    shape: BatchShape,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, shape: BatchShape) -> Self {
        Self {
            path: path.into(),
            shape,
        }
    }
}

#[async_trait]
impl SourceReader for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn read_batch(&self) -> Result<Vec<RawDocument>> {
        let bytes = tokio::fs::read(&self.path).await?;
        debug!("Read {} bytes", bytes.len());
        let payload: Value = serde_json::from_slice(&bytes)?;
        let docs = self.shape.extract(payload)?;
        info!("Loaded {} documents", docs.len());
        Ok(docs)
    }
}

/// Queries a Solr `select` endpoint for every field of the first `rows` hits
pub struct HttpSource {
    url: String,
    shape: BatchShape,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, shape: BatchShape) -> Self {
        Self {
            url: url.into(),
            shape,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn query(&self) -> [(&'static str, String); 3] {
        [
            ("fl", "*".to_string()),
            ("q", "*".to_string()),
            ("rows", self.shape.rows.to_string()),
        ]
    }
}

#[async_trait]
impl SourceReader for HttpSource {
    fn describe(&self) -> String {
        format!("url {}", self.url)
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn read_batch(&self) -> Result<Vec<RawDocument>> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let resp = client
            .get(&self.url)
            .query(&self.query())
            .send()
            .await?
            .error_for_status()?;
        let payload: Value = resp.json().await?;
        let docs = self.shape.extract(payload)?;
        info!("Fetched {} documents", docs.len());
        Ok(docs)
    }
}
