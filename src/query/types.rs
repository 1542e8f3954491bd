//! Query types and result structures

use crate::graph::{Contradiction, Label, SortKey};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors from malformed label queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query has no content id")]
    MissingContentId,

    #[error("perpage must be at least 1, got {0}")]
    InvalidPerPage(usize),

    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Result semantics of a label query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Which {
    /// Every pair of nodes in the anchor's equivalence class
    #[default]
    Connected,
    /// Derived negatives not already stated explicitly
    NegativeInference,
    /// Connected, plus one hop through a labelled whole-item node
    Expanded,
    /// Every stored label touching the anchor
    Direct,
}

impl Which {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::NegativeInference => "negative-inference",
            Self::Expanded => "expanded",
            Self::Direct => "direct",
        }
    }
}

impl FromStr for Which {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(Self::Connected),
            "negative-inference" => Ok(Self::NegativeInference),
            "expanded" => Ok(Self::Expanded),
            "direct" => Ok(Self::Direct),
            other => Err(QueryError::UnknownPredicate(other.to_string())),
        }
    }
}

impl std::fmt::Display for Which {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position after the last returned result.
///
/// A self-contained value: resuming from it needs no server-side state, and
/// it stays meaningful as the label set grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(SortKey);

impl Cursor {
    pub(crate) fn new(key: SortKey) -> Self {
        Self(key)
    }

    pub(crate) fn key(&self) -> &SortKey {
        &self.0
    }

    /// Opaque token for handing to a client
    pub fn encode(&self) -> Result<String, QueryError> {
        serde_json::to_string(&self.0).map_err(|e| QueryError::InvalidCursor(e.to_string()))
    }

    /// Parse a token produced by [`encode`](Self::encode)
    pub fn decode(token: &str) -> Result<Self, QueryError> {
        serde_json::from_str(token)
            .map(Self)
            .map_err(|e| QueryError::InvalidCursor(e.to_string()))
    }
}

/// One page of label query results
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelPage {
    /// Results in order, each oriented with an anchor as `node_a` where possible
    pub labels: Vec<Label>,
    /// Resume point for the next page
    pub cursor: Option<Cursor>,
    /// Whether more results follow this page
    pub has_more: bool,
    /// Contradictions recorded against the anchor's classes
    pub contradictions: Vec<Contradiction>,
}

impl LabelPage {
    /// True if the page holds a label asserting the same fact
    pub fn contains(&self, label: &Label) -> bool {
        self.labels.iter().any(|l| l.same_fact(label))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
