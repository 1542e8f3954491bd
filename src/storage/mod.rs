//! Storage backends for Dossier
//!
//! Durable state sits behind the `DossierStore` trait. The primary
//! implementation is `SqliteStore`: an append-only label table plus a
//! feature-collection table.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DossierStore, OpenStore, StorageError, StorageResult};
