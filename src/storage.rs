use crate::error::Result;
use crate::types::CanonicalDocument;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Destination for canonical documents
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Persist one document. Failures are not retried.
    async fn write(&self, doc: &CanonicalDocument) -> Result<()>;

    /// Flush and release whatever the writer holds; called once after the
    /// last document.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory writer for development/testing and dry runs
#[derive(Clone, Default)]
pub struct InMemoryWriter {
    docs: Arc<Mutex<Vec<CanonicalDocument>>>,
}

impl InMemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents written so far, in write order
    pub fn documents(&self) -> Vec<CanonicalDocument> {
        self.docs.lock().map(|docs| docs.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().map(|docs| docs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordWriter for InMemoryWriter {
    async fn write(&self, doc: &CanonicalDocument) -> Result<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.push(doc.clone());
        debug!("Stored document {} in memory", doc.id);
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct NdjsonWriter {
    out: tokio::sync::Mutex<BufWriter<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl NdjsonWriter {
    pub fn new(out: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self {
            out: tokio::sync::Mutex::new(BufWriter::new(out)),
        }
    }

    /// Create (or truncate) `path`, creating parent directories as needed.
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let file = tokio::fs::File::create(path).await?;
        info!("Writing canonical documents to {}", path.display());
        Ok(Self::new(Box::new(file)))
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }
}

#[async_trait]
impl RecordWriter for NdjsonWriter {
    async fn write(&self, doc: &CanonicalDocument) -> Result<()> {
        let mut line = doc.to_json()?;
        line.push('\n');
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        self.out.lock().await.flush().await?;
        Ok(())
    }
}
