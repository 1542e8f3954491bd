//! Transport-independent API layer.
//!
//! `DossierApi` is the single entry point for consumer-facing operations.
//! Transports (HTTP, CLI, direct embedding) call `DossierApi` methods; they
//! never reach into the ledger or constraint graph directly.

use std::sync::Arc;

use crate::feature::{FeatureCollection, FeatureValue};
use crate::graph::{AppendOutcome, Contradiction, DossierEngine, DossierResult, Label, Node};
use crate::query::{LabelFetcher, LabelPage};

/// Single entry point for all consumer-facing operations.
#[derive(Debug, Clone)]
pub struct DossierApi {
    engine: Arc<DossierEngine>,
}

impl DossierApi {
    /// Create a new API instance.
    pub fn new(engine: Arc<DossierEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<DossierEngine> {
        &self.engine
    }

    // --- Labels ---

    /// Record one label. Contradictions come back in the outcome, not as errors.
    pub fn add_label(&self, label: Label) -> DossierResult<AppendOutcome> {
        self.engine.append_label(label)
    }

    /// Record several labels atomically.
    pub fn add_labels(&self, labels: Vec<Label>) -> DossierResult<Vec<AppendOutcome>> {
        self.engine.append_labels(labels)
    }

    /// Run a label query and return one page.
    pub fn query(&self, fetcher: &LabelFetcher) -> DossierResult<LabelPage> {
        fetcher.get(&self.engine)
    }

    /// Every stored label touching a node, oriented from it.
    pub fn labels_touching(&self, node: &Node) -> DossierResult<Vec<Label>> {
        self.engine.labels_touching(node)
    }

    /// All contradictions recorded so far.
    pub fn contradictions(&self) -> DossierResult<Vec<Contradiction>> {
        self.engine.contradictions()
    }

    /// Check derived-state invariants.
    pub fn verify(&self) -> DossierResult<()> {
        self.engine.verify()
    }

    // --- Feature collections ---

    pub fn fc_put(&self, content_id: &str, fc: FeatureCollection) -> DossierResult<()> {
        self.engine.put_feature_collection(content_id, fc)
    }

    pub fn fc_get(&self, content_id: &str) -> DossierResult<Option<FeatureCollection>> {
        self.engine.get_feature_collection(content_id)
    }

    /// A random stored feature collection with its content id.
    pub fn fc_random(&self) -> DossierResult<Option<(String, FeatureCollection)>> {
        self.engine.random_feature_collection()
    }

    /// Resolved scalar value of one feature; `None` if the collection or the
    /// feature is absent.
    pub fn feature_value(&self, content_id: &str, name: &str) -> DossierResult<Option<String>> {
        Ok(self
            .fc_get(content_id)?
            .and_then(|fc| fc.value(name).map(str::to_string)))
    }

    /// Raw stored value of one feature.
    pub fn feature(&self, content_id: &str, name: &str) -> DossierResult<Option<FeatureValue>> {
        Ok(self
            .fc_get(content_id)?
            .and_then(|fc| fc.feature(name).cloned()))
    }
}
