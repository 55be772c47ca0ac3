use crate::error::{ImporterError, Result};
use crate::metrics;
use crate::normalize::DocumentNormalizer;
use crate::storage::RecordWriter;
use crate::types::{Normalized, RawDocument};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Outcome of a completed batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub total_documents: usize,
    pub written_documents: usize,
    pub skipped_documents: usize,
    /// Present values that had to be replaced, summed over the batch
    pub coerced_fields: usize,
    pub duration_secs: f64,
}

/// Tracks which tenth of the batch has been reported.
///
/// A batch of `total` documents reports decile `processed * 10 / total`
/// whenever that exceeds the last reported one, so small batches report
/// fewer, larger steps and an empty batch reports nothing.
#[derive(Debug, Clone)]
pub struct DecileProgress {
    total: usize,
    reported: usize,
}

impl DecileProgress {
    pub fn new(total: usize) -> Self {
        Self { total, reported: 0 }
    }

    /// Record that `processed` documents are done; returns the percentage to
    /// report if a new decile was reached.
    pub fn advance(&mut self, processed: usize) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let decile = processed.min(self.total) * 10 / self.total;
        if decile > self.reported {
            self.reported = decile;
            // at most 100
            Some((decile * 10) as u8)
        } else {
            None
        }
    }
}

/// Runs one bounded batch: normalize each document in order and hand every
/// non-skipped one to the writer. The first write failure aborts the batch.
pub struct BatchDriver<'a> {
    normalizer: &'a DocumentNormalizer,
    writer: &'a dyn RecordWriter,
}

impl<'a> BatchDriver<'a> {
    pub fn new(normalizer: &'a DocumentNormalizer, writer: &'a dyn RecordWriter) -> Self {
        Self { normalizer, writer }
    }

    #[instrument(skip(self, docs), fields(total = docs.len()))]
    pub async fn run(&self, docs: Vec<RawDocument>) -> Result<BatchReport> {
        let started_at = Utc::now();
        let t_batch = Instant::now();
        let total = docs.len();
        metrics::documents_read(total);

        info!("🔧 Normalizing and writing {} documents", total);
        let mut progress = DecileProgress::new(total);
        let mut written = 0;
        let mut skipped = 0;
        let mut coerced = 0;

        for (i, raw) in docs.into_iter().enumerate() {
            match self.normalizer.normalize(raw) {
                Normalized::Skip(reason) => {
                    debug!("Skipping document {}: {}", i, reason);
                    skipped += 1;
                    metrics::document_skipped();
                }
                Normalized::Document { document, coercions } => {
                    for coercion in &coercions {
                        debug!(index = i, field = coercion.field, "{}", coercion.note);
                        metrics::field_coerced(coercion.field);
                    }
                    coerced += coercions.len();

                    if let Err(e) = self.writer.write(&document).await {
                        error!("Write failed for document {} ({}): {}", i, document.id, e);
                        metrics::write_failed();
                        return Err(ImporterError::Write {
                            index: i,
                            id: document.id,
                            message: e.to_string(),
                        });
                    }
                    written += 1;
                    metrics::document_written();
                }
            }

            if let Some(pct) = progress.advance(i + 1) {
                info!("{}% complete ({}/{})", pct, i + 1, total);
            }
        }

        self.writer.finish().await?;

        let duration_secs = t_batch.elapsed().as_secs_f64();
        metrics::batch_duration(duration_secs);
        info!(
            "✅ Batch finished: {} written, {} skipped, {} fields coerced",
            written, skipped, coerced
        );

        Ok(BatchReport {
            started_at,
            total_documents: total,
            written_documents: written,
            skipped_documents: skipped,
            coerced_fields: coerced,
            duration_secs,
        })
    }
}
