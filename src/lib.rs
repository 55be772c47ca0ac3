pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod types;

pub use normalize::{normalize, DocumentNormalizer, NormalizerSettings};
pub use pipeline::{BatchDriver, BatchReport};
pub use types::{CanonicalDocument, Normalized, RawDocument};
