//! Dossier: coreference labels with must-link / cannot-link inference
//!
//! Stores pairwise judgments ("labels") about whether two content items, or
//! sub-topics of content items, refer to the same entity, and answers
//! connectivity queries over them.
//!
//! # Core Concepts
//!
//! - **Nodes**: a whole content item or one of its sub-topics
//! - **Labels**: immutable positive (must-link) or negative (cannot-link) facts
//! - **Classes**: nodes unified by positive labels, each with a cannot-link set
//! - **Feature collections**: per-item attribute bags with scalar resolution
//!
//! # Example
//!
//! ```
//! use dossier::{DossierEngine, Label, Node};
//!
//! let engine = DossierEngine::new();
//! engine.append_label(Label::positive("a", "b", "tester")).unwrap();
//! assert!(engine.is_connected(&Node::item("a"), &Node::item("b")).unwrap());
//! ```

pub mod api;
pub mod config;
pub mod feature;
mod graph;
pub mod query;
pub mod storage;

pub use api::DossierApi;
pub use feature::{FeatureCollection, FeatureValue, StringCounter};
pub use graph::{
    AppendOutcome, ClassId, ConstraintGraph, Contradiction, ContradictionKind, CorefValue,
    DossierEngine, DossierError, DossierResult, InvariantViolation, Label, LabelLedger,
    LabelState, Node, SortKey, StoredLabel,
};
pub use query::{Cursor, LabelFetcher, LabelPage, QueryError, Which};
pub use storage::{DossierStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
