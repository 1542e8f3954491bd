//! DossierEngine: the main entry point for labels and feature collections

use super::constraint::{ConstraintGraph, Contradiction, InvariantViolation};
use super::label::{Label, StoredLabel};
use super::ledger::LabelLedger;
use super::node::Node;
use crate::feature::FeatureCollection;
use crate::query::{LabelFetcher, LabelPage, QueryError};
use crate::storage::{DossierStore, StorageError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::seq::IteratorRandom;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur in Dossier operations
#[derive(Debug, Error)]
pub enum DossierError {
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Label state lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),
}

/// Result type for Dossier operations
pub type DossierResult<T> = Result<T, DossierError>;

/// What happened to one appended label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// Ledger sequence number assigned to the label
    pub seq: u64,
    /// Set when the label was recorded but its merge or split was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contradiction: Option<Contradiction>,
}

/// The label ledger and the graph derived from it.
///
/// Always mutated together under the engine's write lock.
#[derive(Debug, Default)]
pub struct LabelState {
    pub ledger: LabelLedger,
    pub graph: ConstraintGraph,
}

impl LabelState {
    fn apply(&mut self, stored: StoredLabel) -> Option<Contradiction> {
        let contradiction = self.graph.incorporate(&stored);
        self.ledger.push(stored);
        contradiction
    }
}

/// The main Dossier engine
///
/// Owns the label state (ledger + constraint graph) behind a single
/// reader/writer lock, an optional durable store, and a write-through cache
/// of feature collections.
pub struct DossierEngine {
    state: RwLock<LabelState>,
    /// Feature collections by content id
    features: DashMap<String, FeatureCollection>,
    /// Optional persistent storage backend
    store: Option<Arc<dyn DossierStore>>,
}

impl Default for DossierEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DossierEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DossierEngine")
            .field("features", &self.features.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl DossierEngine {
    /// Create an in-memory engine with no persistence
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LabelState::default()),
            features: DashMap::new(),
            store: None,
        }
    }

    /// Create an engine backed by a persistent store.
    ///
    /// Call [`load_all`](Self::load_all) to rebuild state from the store.
    pub fn with_store(store: Arc<dyn DossierStore>) -> Self {
        Self {
            state: RwLock::new(LabelState::default()),
            features: DashMap::new(),
            store: Some(store),
        }
    }

    /// Rebuild label state by replaying every stored label in sequence order.
    ///
    /// Returns the number of labels replayed. A no-op without a store.
    pub fn load_all(&self) -> DossierResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let labels = store.load_labels()?;
        let count = labels.len();

        let mut rebuilt = LabelState::default();
        for stored in labels {
            rebuilt.apply(stored);
        }
        let contradictions = rebuilt.graph.contradictions().len();
        *self.write()? = rebuilt;
        self.features.clear();

        info!(labels = count, contradictions, "replayed label ledger");
        Ok(count)
    }

    // --- Labels: write ---

    /// Append one label and fold it into the constraint graph.
    ///
    /// The store write happens under the state lock before any in-memory
    /// change, so a storage failure leaves nothing observable.
    pub fn append_label(&self, label: Label) -> DossierResult<AppendOutcome> {
        validate(&label)?;
        let mut state = self.write()?;

        let seq = match &self.store {
            Some(store) => store.append_label(&label)?,
            None => state.ledger.next_seq(),
        };
        Ok(Self::apply_logged(&mut state, StoredLabel::new(seq, label)))
    }

    /// Append a batch of labels atomically, in order.
    pub fn append_labels(&self, labels: Vec<Label>) -> DossierResult<Vec<AppendOutcome>> {
        for label in &labels {
            validate(label)?;
        }
        let mut state = self.write()?;

        let seqs = match &self.store {
            Some(store) => store.append_labels(&labels)?,
            None => {
                let first = state.ledger.next_seq();
                (first..first + labels.len() as u64).collect()
            }
        };
        Ok(seqs
            .into_iter()
            .zip(labels)
            .map(|(seq, label)| Self::apply_logged(&mut state, StoredLabel::new(seq, label)))
            .collect())
    }

    fn apply_logged(state: &mut LabelState, stored: StoredLabel) -> AppendOutcome {
        let seq = stored.seq;
        debug!(
            seq,
            a = %stored.label.node_a,
            b = %stored.label.node_b,
            value = %stored.label.value,
            annotator = %stored.label.annotator_id,
            "appending label"
        );
        let contradiction = state.apply(stored);
        if let Some(c) = &contradiction {
            warn!(
                seq,
                a = %c.label.node_a,
                b = %c.label.node_b,
                kind = ?c.kind,
                "label contradicts existing constraints; recorded without applying"
            );
        }
        AppendOutcome { seq, contradiction }
    }

    // --- Labels: read ---

    /// Every label touching `node`, oriented from it, in result order
    pub fn labels_touching(&self, node: &Node) -> DossierResult<Vec<Label>> {
        Ok(self
            .read()?
            .ledger
            .labels_touching(node)
            .into_iter()
            .map(|stored| stored.label)
            .collect())
    }

    pub fn is_connected(&self, x: &Node, y: &Node) -> DossierResult<bool> {
        Ok(self.read()?.graph.is_connected(x, y))
    }

    /// Sorted members of the equivalence class containing `node`
    pub fn class_members(&self, node: &Node) -> DossierResult<Vec<Node>> {
        Ok(self.read()?.graph.class_members(node))
    }

    pub fn inferred_negatives(&self, node: &Node) -> DossierResult<BTreeSet<Node>> {
        Ok(self.read()?.graph.inferred_negatives(node))
    }

    /// Every contradiction recorded so far, in append order
    pub fn contradictions(&self) -> DossierResult<Vec<Contradiction>> {
        Ok(self.read()?.graph.contradictions().to_vec())
    }

    pub fn label_count(&self) -> DossierResult<usize> {
        Ok(self.read()?.ledger.len())
    }

    /// Execute a label query against the current state
    pub fn query(&self, fetcher: &LabelFetcher) -> DossierResult<LabelPage> {
        let state = self.read()?;
        Ok(fetcher.execute(&state)?)
    }

    /// Check the derived-state invariants
    pub fn verify(&self) -> DossierResult<()> {
        self.read()?.graph.verify()?;
        Ok(())
    }

    // --- Feature collections ---

    /// Create or replace the feature collection for a content item.
    ///
    /// The cache entry stays locked across the store write, so the cache and
    /// the store agree on the last writer.
    pub fn put_feature_collection(&self, content_id: &str, fc: FeatureCollection) -> DossierResult<()> {
        let entry = self.features.entry(content_id.to_string());
        if let Some(store) = &self.store {
            store.put_feature_collection(content_id, &fc)?;
        }
        entry.insert(fc);
        Ok(())
    }

    pub fn get_feature_collection(&self, content_id: &str) -> DossierResult<Option<FeatureCollection>> {
        if let Some(fc) = self.features.get(content_id) {
            return Ok(Some(fc.clone()));
        }
        let Some(store) = &self.store else {
            return Ok(None);
        };
        // Load under the entry lock so a concurrent put cannot be overwritten
        // by the value read here.
        match self.features.entry(content_id.to_string()) {
            Entry::Occupied(cached) => Ok(Some(cached.get().clone())),
            Entry::Vacant(vacant) => match store.get_feature_collection(content_id)? {
                Some(fc) => Ok(Some(vacant.insert(fc).value().clone())),
                None => Ok(None),
            },
        }
    }

    /// One feature collection chosen at random, with its content id
    pub fn random_feature_collection(&self) -> DossierResult<Option<(String, FeatureCollection)>> {
        if let Some(store) = &self.store {
            return Ok(store.random_feature_collection()?);
        }
        Ok(self
            .features
            .iter()
            .choose(&mut rand::thread_rng())
            .map(|entry| (entry.key().clone(), entry.value().clone())))
    }

    fn read(&self) -> DossierResult<RwLockReadGuard<'_, LabelState>> {
        self.state.read().map_err(|_| DossierError::LockPoisoned)
    }

    fn write(&self) -> DossierResult<RwLockWriteGuard<'_, LabelState>> {
        self.state.write().map_err(|_| DossierError::LockPoisoned)
    }
}

fn validate(label: &Label) -> DossierResult<()> {
    for node in [&label.node_a, &label.node_b] {
        if node.content_id().is_empty() {
            return Err(DossierError::InvalidLabel("empty content id".into()));
        }
        if node.subtopic_id() == Some("") {
            return Err(DossierError::InvalidLabel(format!(
                "empty subtopic id on {}",
                node.content_id()
            )));
        }
    }
    if label.annotator_id.is_empty() {
        return Err(DossierError::InvalidLabel("empty annotator id".into()));
    }
    Ok(())
}
