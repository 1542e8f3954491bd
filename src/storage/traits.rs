//! Storage trait definitions

use crate::feature::FeatureCollection;
use crate::graph::{Label, StoredLabel};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for durable label and feature-collection backends
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent access from multiple threads.
pub trait DossierStore: Send + Sync {
    // === Label Operations ===

    /// Append one label, returning its sequence number
    fn append_label(&self, label: &Label) -> StorageResult<u64>;

    /// Append a batch atomically, returning sequence numbers in input order
    fn append_labels(&self, labels: &[Label]) -> StorageResult<Vec<u64>>;

    /// Load every label in sequence order
    fn load_labels(&self) -> StorageResult<Vec<StoredLabel>>;

    // === Feature Collection Operations ===

    /// Create or replace the feature collection for a content item
    fn put_feature_collection(&self, content_id: &str, fc: &FeatureCollection) -> StorageResult<()>;

    /// Load the feature collection for a content item
    fn get_feature_collection(&self, content_id: &str) -> StorageResult<Option<FeatureCollection>>;

    /// Load one feature collection chosen at random
    fn random_feature_collection(&self) -> StorageResult<Option<(String, FeatureCollection)>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: DossierStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
