//! Core label and constraint-graph data structures

mod constraint;
mod engine;
mod label;
mod ledger;
mod node;


pub use constraint::{ClassId, ConstraintGraph, Contradiction, ContradictionKind, InvariantViolation};
pub use engine::{AppendOutcome, DossierEngine, DossierError, DossierResult, LabelState};
pub use label::{CorefValue, Label, SortKey, StoredLabel};
pub use ledger::LabelLedger;
pub use node::Node;
