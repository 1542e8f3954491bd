//! Query system for Dossier labels
//!
//! `LabelFetcher` builds a label query by chaining, then runs it against a
//! snapshot of the ledger and constraint graph to produce one page of
//! results plus a cursor.

mod fetch;
mod traverse;
mod types;

pub use fetch::LabelFetcher;
pub use types::{Cursor, LabelPage, QueryError, Which};
