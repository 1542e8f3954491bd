//! Feature collections: per-content-item attribute bags
//!
//! Only the read-side value resolution is interesting here; persistence is a
//! plain key-value table in the store.

mod collection;

pub use collection::{FeatureCollection, FeatureValue, StringCounter};
