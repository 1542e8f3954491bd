//! In-memory index over the append-only label ledger

use super::label::{CorefValue, StoredLabel};
use super::node::Node;
use std::collections::HashMap;

/// Append-only record of every label, indexed by endpoint node.
///
/// Mirrors the durable `labels` table. Labels are never mutated or removed;
/// a correction is a new label for the same pair.
#[derive(Debug, Default)]
pub struct LabelLedger {
    /// All labels in append order
    labels: Vec<StoredLabel>,
    /// Node -> positions in `labels` of every label touching it
    touching: HashMap<Node, Vec<usize>>,
    next_seq: u64,
}

impl LabelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next in-memory append will receive
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Record a label. The caller supplies the sequence number (store-assigned
    /// when persistent, `next_seq()` otherwise).
    pub fn push(&mut self, stored: StoredLabel) {
        let position = self.labels.len();
        self.next_seq = self.next_seq.max(stored.seq + 1);

        self.touching
            .entry(stored.label.node_a.clone())
            .or_default()
            .push(position);
        if !stored.label.is_self_pair() {
            self.touching
                .entry(stored.label.node_b.clone())
                .or_default()
                .push(position);
        }
        self.labels.push(stored);
    }

    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    /// Unordered, unoriented view of the labels touching `node`
    pub fn touching<'a>(&'a self, node: &Node) -> impl Iterator<Item = &'a StoredLabel> + 'a {
        self.touching
            .get(node)
            .into_iter()
            .flatten()
            .map(move |&position| &self.labels[position])
    }

    /// Every label touching `node`, oriented so `node` is `node_a`, in
    /// result order (destination, creation time, annotator).
    pub fn labels_touching(&self, node: &Node) -> Vec<StoredLabel> {
        let mut labels: Vec<StoredLabel> = self
            .touching(node)
            .map(|stored| stored.oriented_from(node))
            .collect();
        labels.sort_by_key(StoredLabel::sort_key);
        labels
    }

    /// True if some stored label with `value` names exactly `{x, y}`
    pub fn has_explicit(&self, x: &Node, y: &Node, value: CorefValue) -> bool {
        self.touching(x)
            .any(|stored| stored.label.value == value && stored.label.names_pair(x, y))
    }
}
