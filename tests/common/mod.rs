//! Common test utilities for Dossier integration tests
//!
//! Helpers for building engines over in-memory or on-disk SQLite stores and
//! for draining paginated queries.

#![allow(dead_code)]

use dossier::{
    CorefValue, DossierApi, DossierEngine, Label, LabelFetcher, LabelPage, Node, OpenStore,
    SqliteStore,
};
use std::path::Path;
use std::sync::Arc;

/// API over a fresh in-memory SQLite store
pub fn api() -> DossierApi {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    DossierApi::new(Arc::new(DossierEngine::with_store(Arc::new(store))))
}

/// API over a SQLite file, replaying whatever it already holds
pub fn api_at(path: &Path) -> DossierApi {
    let store = SqliteStore::open(path).expect("open store");
    let engine = DossierEngine::with_store(Arc::new(store));
    engine.load_all().expect("replay");
    DossierApi::new(Arc::new(engine))
}

pub fn sub(content_id: &str, subtopic_id: &str) -> Node {
    Node::subtopic(content_id, subtopic_id)
}

/// Positive label between two sub-topic nodes
pub fn sub_positive(cid1: &str, cid2: &str, sub1: &str, sub2: &str) -> Label {
    Label::new(sub(cid1, sub1), sub(cid2, sub2), "tester", CorefValue::Positive)
}

/// Follow cursors until a page reports nothing more, collecting every label
pub fn drain(api: &DossierApi, query: LabelFetcher) -> Vec<Label> {
    let mut labels = Vec::new();
    let mut page: LabelPage = api.query(&query).expect("first page");
    loop {
        labels.extend(page.labels.iter().cloned());
        if !page.has_more {
            return labels;
        }
        page = api.query(&query.clone().next(&page)).expect("next page");
    }
}

/// Whether any label in `labels` touches `node`
pub fn mentions(labels: &[Label], node: &Node) -> bool {
    labels.iter().any(|label| label.touches(node))
}
