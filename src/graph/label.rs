//! Label facts: immutable coreference judgments between two nodes

use super::node::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether two nodes refer to the same entity.
///
/// Serializes as the integers used on the wire: `1` for
/// positive, `-1` for negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum CorefValue {
    /// Must-link
    Positive,
    /// Cannot-link
    Negative,
}

impl CorefValue {
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Positive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl From<CorefValue> for i8 {
    fn from(value: CorefValue) -> Self {
        match value {
            CorefValue::Positive => 1,
            CorefValue::Negative => -1,
        }
    }
}

impl TryFrom<i8> for CorefValue {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Positive),
            -1 => Ok(Self::Negative),
            other => Err(format!("invalid coref value: {}", other)),
        }
    }
}

impl std::fmt::Display for CorefValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable judgment that two nodes do or do not corefer.
///
/// Labels are symmetric: `(a, b)` and `(b, a)` denote the same fact.
/// Which endpoint is `node_a` only matters for presentation; query results
/// orient labels so the anchor comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LabelRepr", into = "LabelRepr")]
pub struct Label {
    pub node_a: Node,
    pub node_b: Node,
    pub annotator_id: String,
    pub value: CorefValue,
    pub created_at: DateTime<Utc>,
}

impl Label {
    /// Create a label stamped with the current time
    pub fn new(
        node_a: Node,
        node_b: Node,
        annotator_id: impl Into<String>,
        value: CorefValue,
    ) -> Self {
        Self {
            node_a,
            node_b,
            annotator_id: annotator_id.into(),
            value,
            created_at: Utc::now(),
        }
    }

    /// Positive label between two whole-item nodes
    pub fn positive(cid1: &str, cid2: &str, annotator_id: impl Into<String>) -> Self {
        Self::new(Node::item(cid1), Node::item(cid2), annotator_id, CorefValue::Positive)
    }

    /// Negative label between two whole-item nodes
    pub fn negative(cid1: &str, cid2: &str, annotator_id: impl Into<String>) -> Self {
        Self::new(Node::item(cid1), Node::item(cid2), annotator_id, CorefValue::Negative)
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn touches(&self, node: &Node) -> bool {
        &self.node_a == node || &self.node_b == node
    }

    /// The endpoint opposite `node`, if the label touches it
    pub fn other_end(&self, node: &Node) -> Option<&Node> {
        if &self.node_a == node {
            Some(&self.node_b)
        } else if &self.node_b == node {
            Some(&self.node_a)
        } else {
            None
        }
    }

    pub fn is_self_pair(&self) -> bool {
        self.node_a == self.node_b
    }

    /// The same fact with its endpoints swapped
    pub fn reversed(&self) -> Self {
        Self {
            node_a: self.node_b.clone(),
            node_b: self.node_a.clone(),
            ..self.clone()
        }
    }

    /// True if both labels assert the same judgment by the same annotator
    /// about the same unordered pair. Timestamps are ignored.
    pub fn same_fact(&self, other: &Label) -> bool {
        let same_pair = (self.node_a == other.node_a && self.node_b == other.node_b)
            || (self.node_a == other.node_b && self.node_b == other.node_a);
        same_pair && self.annotator_id == other.annotator_id && self.value == other.value
    }

    /// True if this label names exactly the unordered pair `{x, y}`
    pub fn names_pair(&self, x: &Node, y: &Node) -> bool {
        (&self.node_a == x && &self.node_b == y) || (&self.node_a == y && &self.node_b == x)
    }
}

/// A label as recorded in the ledger, with its append position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLabel {
    /// Store-assigned sequence number; replay order and final tiebreak
    pub seq: u64,
    pub label: Label,
}

impl StoredLabel {
    pub fn new(seq: u64, label: Label) -> Self {
        Self { seq, label }
    }

    /// Orient the label so `node` is `node_a`. Labels not touching `node`
    /// are returned unchanged.
    pub fn oriented_from(&self, node: &Node) -> StoredLabel {
        if self.label.node_b == *node && self.label.node_a != *node {
            StoredLabel::new(self.seq, self.label.reversed())
        } else {
            self.clone()
        }
    }

    /// Orient the label so its lesser endpoint is `node_a`.
    pub fn canonical(&self) -> StoredLabel {
        if self.label.node_b < self.label.node_a {
            StoredLabel::new(self.seq, self.label.reversed())
        } else {
            self.clone()
        }
    }

    /// Position of this (already oriented) label in result order
    pub fn sort_key(&self) -> SortKey {
        SortKey {
            destination: self.label.node_b.clone(),
            created_at: self.label.created_at,
            annotator_id: self.label.annotator_id.clone(),
            source: self.label.node_a.clone(),
            seq: self.seq,
        }
    }
}

/// Total order over oriented labels.
///
/// Destination node first, then creation time, then annotator. Source node
/// and ledger sequence break the remaining ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub destination: Node,
    pub created_at: DateTime<Utc>,
    pub annotator_id: String,
    pub source: Node,
    pub seq: u64,
}

/// Flat wire form matching the browser client's label objects
#[derive(Serialize, Deserialize)]
struct LabelRepr {
    content_id1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtopic_id1: Option<String>,
    content_id2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtopic_id2: Option<String>,
    annotator_id: String,
    value: CorefValue,
    created_at: DateTime<Utc>,
}

impl From<LabelRepr> for Label {
    fn from(repr: LabelRepr) -> Self {
        Label {
            node_a: Node::from_parts(repr.content_id1, repr.subtopic_id1),
            node_b: Node::from_parts(repr.content_id2, repr.subtopic_id2),
            annotator_id: repr.annotator_id,
            value: repr.value,
            created_at: repr.created_at,
        }
    }
}

impl From<Label> for LabelRepr {
    fn from(label: Label) -> Self {
        LabelRepr {
            content_id1: label.node_a.content_id().to_string(),
            subtopic_id1: label.node_a.subtopic_id().map(str::to_string),
            content_id2: label.node_b.content_id().to_string(),
            subtopic_id2: label.node_b.subtopic_id().map(str::to_string),
            annotator_id: label.annotator_id,
            value: label.value,
            created_at: label.created_at,
        }
    }
}
