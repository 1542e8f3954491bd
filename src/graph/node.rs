//! Node identity in the constraint graph

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A node in the constraint graph: a whole content item, or one of its sub-topics.
///
/// The two variants are distinct identities. `Node::item("a")` and
/// `Node::subtopic("a", "s1")` are never equal and are never linked merely
/// because they share a content id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "NodeRepr", into = "NodeRepr")]
pub enum Node {
    /// The whole content item
    Item { content_id: String },
    /// One sub-topic of a content item
    Subtopic {
        content_id: String,
        subtopic_id: String,
    },
}

impl Node {
    /// Whole-item node
    pub fn item(content_id: impl Into<String>) -> Self {
        Self::Item {
            content_id: content_id.into(),
        }
    }

    /// Sub-topic node
    pub fn subtopic(content_id: impl Into<String>, subtopic_id: impl Into<String>) -> Self {
        Self::Subtopic {
            content_id: content_id.into(),
            subtopic_id: subtopic_id.into(),
        }
    }

    /// Build from the optional-subtopic form used on the wire and in storage.
    pub fn from_parts(content_id: impl Into<String>, subtopic_id: Option<String>) -> Self {
        match subtopic_id {
            Some(subtopic_id) => Self::subtopic(content_id, subtopic_id),
            None => Self::item(content_id),
        }
    }

    pub fn content_id(&self) -> &str {
        match self {
            Self::Item { content_id } | Self::Subtopic { content_id, .. } => content_id,
        }
    }

    pub fn subtopic_id(&self) -> Option<&str> {
        match self {
            Self::Item { .. } => None,
            Self::Subtopic { subtopic_id, .. } => Some(subtopic_id),
        }
    }

    /// The whole-item node for this node's content id
    pub fn as_item(&self) -> Node {
        Node::item(self.content_id())
    }

    /// Sort key: content id, then whole-item before any sub-topic, then sub-topic id.
    fn sort_key(&self) -> (&str, Option<&str>) {
        (self.content_id(), self.subtopic_id())
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item { content_id } => write!(f, "{}", content_id),
            Self::Subtopic {
                content_id,
                subtopic_id,
            } => write!(f, "{}#{}", content_id, subtopic_id),
        }
    }
}

/// Flat wire form: `{"content_id": "a", "subtopic_id": "s1"}`
#[derive(Serialize, Deserialize)]
struct NodeRepr {
    content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtopic_id: Option<String>,
}

impl From<NodeRepr> for Node {
    fn from(repr: NodeRepr) -> Self {
        Node::from_parts(repr.content_id, repr.subtopic_id)
    }
}

impl From<Node> for NodeRepr {
    fn from(node: Node) -> Self {
        match node {
            Node::Item { content_id } => NodeRepr {
                content_id,
                subtopic_id: None,
            },
            Node::Subtopic {
                content_id,
                subtopic_id,
            } => NodeRepr {
                content_id,
                subtopic_id: Some(subtopic_id),
            },
        }
    }
}
