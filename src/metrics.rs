//! Batch metrics.
//!
//! Counters are recorded through the `metrics` facade and are no-ops unless
//! [`init_metrics`] installed the Prometheus exporter.

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

pub const DOCUMENTS_READ: &str = "doc_importer_documents_read_total";
pub const DOCUMENTS_WRITTEN: &str = "doc_importer_documents_written_total";
pub const DOCUMENTS_SKIPPED: &str = "doc_importer_documents_skipped_total";
pub const FIELDS_COERCED: &str = "doc_importer_fields_coerced_total";
pub const WRITE_FAILURES: &str = "doc_importer_write_failures_total";
pub const BATCH_DURATION: &str = "doc_importer_batch_duration_seconds";

/// Install the Prometheus exporter listening on `addr`. Idempotent; must run
/// inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                describe();
                info!("Prometheus exporter listening at http://{}/metrics", addr);
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

fn describe() {
    ::metrics::describe_counter!(DOCUMENTS_READ, "Documents loaded from the source");
    ::metrics::describe_counter!(DOCUMENTS_WRITTEN, "Canonical documents written");
    ::metrics::describe_counter!(DOCUMENTS_SKIPPED, "Documents dropped for lacking a title");
    ::metrics::describe_counter!(FIELDS_COERCED, "Present field values replaced during normalization");
    ::metrics::describe_counter!(WRITE_FAILURES, "Writes that aborted a batch");
    ::metrics::describe_histogram!(BATCH_DURATION, "Wall time of one batch");
}

pub fn documents_read(count: usize) {
    ::metrics::counter!(DOCUMENTS_READ).increment(count as u64);
}

pub fn document_written() {
    ::metrics::counter!(DOCUMENTS_WRITTEN).increment(1);
}

pub fn document_skipped() {
    ::metrics::counter!(DOCUMENTS_SKIPPED).increment(1);
}

pub fn field_coerced(field: &'static str) {
    ::metrics::counter!(FIELDS_COERCED, "field" => field).increment(1);
}

pub fn write_failed() {
    ::metrics::counter!(WRITE_FAILURES).increment(1);
}

pub fn batch_duration(secs: f64) {
    ::metrics::histogram!(BATCH_DURATION).record(secs);
}
