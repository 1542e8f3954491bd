//! Class-level traversal behind label queries
//!
//! Resolves query anchors to equivalence classes, optionally widens them by
//! one whole-item bridging hop, and enumerates the node pairs, stored labels
//! or inferred negatives inside them.

use crate::graph::{
    ClassId, ConstraintGraph, Contradiction, CorefValue, Label, LabelState, Node, StoredLabel,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Anchor nodes for a content id.
///
/// With a sub-topic, just that node. Otherwise the whole-item node plus every
/// seen sub-topic node of the content id.
pub(crate) fn anchors(graph: &ConstraintGraph, content_id: &str, subtopic_id: Option<&str>) -> Vec<Node> {
    match subtopic_id {
        Some(subtopic_id) => vec![Node::subtopic(content_id, subtopic_id)],
        None => {
            let mut nodes: BTreeSet<Node> = graph.seen_nodes_of(content_id).into_iter().collect();
            nodes.insert(Node::item(content_id));
            nodes.into_iter().collect()
        }
    }
}

/// Classes of the anchors that the graph has seen
pub(crate) fn anchor_classes(graph: &ConstraintGraph, anchors: &[Node]) -> BTreeSet<ClassId> {
    anchors.iter().filter_map(|node| graph.class_id(node)).collect()
}

/// Anchor classes plus a single bridging hop.
///
/// For each content id appearing in the anchor classes whose whole-item node
/// carries a positive label, add the whole-item node's class and the classes
/// of all that content id's sub-topic nodes. Newly reached classes are not
/// expanded further.
pub(crate) fn expanded_classes(graph: &ConstraintGraph, anchors: &[Node]) -> BTreeSet<ClassId> {
    let start = anchor_classes(graph, anchors);
    let items: BTreeSet<Node> = start
        .iter()
        .flat_map(|&class| graph.members(class))
        .map(|node| node.as_item())
        .collect();

    let mut classes = start;
    for item in items {
        let Some(bridge) = graph.class_id(&item) else {
            continue;
        };
        // A singleton whole-item class has no positive label to pass through.
        if graph.members(bridge).len() < 2 {
            continue;
        }
        classes.insert(bridge);
        classes.extend(
            graph
                .seen_nodes_of(item.content_id())
                .iter()
                .filter_map(|node| graph.class_id(node)),
        );
    }
    classes
}

/// Stored positive labels whose endpoints lie inside `classes`.
///
/// Skips self pairs and labels whose merge was rejected as a contradiction.
pub(crate) fn explicit_pairs(state: &LabelState, classes: &BTreeSet<ClassId>) -> Vec<StoredLabel> {
    let rejected = rejected_seqs(&state.graph);
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for &class in classes {
        for member in state.graph.members(class) {
            for stored in state.ledger.touching(&member) {
                let label = &stored.label;
                if !label.value.is_positive() || label.is_self_pair() || rejected.contains(&stored.seq) {
                    continue;
                }
                let inside = [&label.node_a, &label.node_b]
                    .into_iter()
                    .all(|node| state.graph.class_id(node).is_some_and(|c| classes.contains(&c)));
                if inside && seen.insert(stored.seq) {
                    pairs.push(stored.clone());
                }
            }
        }
    }
    pairs
}

/// Every pair of distinct members of each class in `classes`, one result per
/// unordered pair.
///
/// A pair named by a stored positive label is returned as its earliest such
/// label. Any other pair is derived: it takes annotator, timestamp and
/// sequence from the earliest accepted positive label touching either node.
pub(crate) fn class_pairs(state: &LabelState, classes: &BTreeSet<ClassId>) -> Vec<StoredLabel> {
    let explicit = explicit_pairs(state, classes);

    let mut stated: HashMap<(Node, Node), &StoredLabel> = HashMap::new();
    let mut evidence: HashMap<&Node, &StoredLabel> = HashMap::new();
    for stored in &explicit {
        let (a, b) = (&stored.label.node_a, &stored.label.node_b);
        let key = if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        let earliest = stated.entry(key).or_insert(stored);
        if stored.seq < earliest.seq {
            *earliest = stored;
        }
        for node in [a, b] {
            let earliest = evidence.entry(node).or_insert(stored);
            if stored.seq < earliest.seq {
                *earliest = stored;
            }
        }
    }

    let mut pairs = Vec::new();
    for &class in classes {
        for (x, y) in state.graph.all_pairs_in_class(class) {
            let key = (x, y);
            if let Some(stored) = stated.get(&key) {
                pairs.push((*stored).clone());
                continue;
            }
            let (x, y) = key;
            let source = [evidence.get(&x), evidence.get(&y)]
                .into_iter()
                .flatten()
                .min_by_key(|stored| stored.seq);
            // Members of a multi-node class always have accepted evidence.
            let Some(source) = source else {
                continue;
            };
            pairs.push(StoredLabel::new(
                source.seq,
                Label {
                    node_a: x,
                    node_b: y,
                    annotator_id: source.label.annotator_id.clone(),
                    value: CorefValue::Positive,
                    created_at: source.label.created_at,
                },
            ));
        }
    }
    pairs
}

/// Derived negatives for one anchor, excluding pairs stated explicitly.
///
/// Each result pairs the anchor with a node of a cannot-linked class. Its
/// annotator, timestamp and sequence come from the earliest negative label
/// that links the two classes.
pub(crate) fn negative_inferences(state: &LabelState, anchor: &Node) -> Vec<StoredLabel> {
    let graph = &state.graph;
    let Some(class) = graph.class_id(anchor) else {
        return Vec::new();
    };
    let linked: HashSet<ClassId> = graph.cannot_link_classes(class).into_iter().collect();

    let mut evidence: HashMap<ClassId, &StoredLabel> = HashMap::new();
    for member in graph.members(class) {
        for stored in state.ledger.touching(&member) {
            if stored.label.value != CorefValue::Negative {
                continue;
            }
            let Some(other) = stored.label.other_end(&member).and_then(|n| graph.class_id(n)) else {
                continue;
            };
            if !linked.contains(&other) {
                continue;
            }
            let earliest = evidence.entry(other).or_insert(stored);
            if stored.seq < earliest.seq {
                *earliest = stored;
            }
        }
    }

    let mut inferred = Vec::new();
    for other in graph.cannot_link_classes(class) {
        let Some(source) = evidence.get(&other) else {
            continue;
        };
        for node in graph.members(other) {
            if state.ledger.has_explicit(anchor, &node, CorefValue::Negative) {
                continue;
            }
            inferred.push(StoredLabel::new(
                source.seq,
                Label {
                    node_a: anchor.clone(),
                    node_b: node,
                    annotator_id: source.label.annotator_id.clone(),
                    value: CorefValue::Negative,
                    created_at: source.label.created_at,
                },
            ));
        }
    }
    inferred
}

/// Contradictions with an endpoint inside `classes`
pub(crate) fn contradictions_touching(graph: &ConstraintGraph, classes: &BTreeSet<ClassId>) -> Vec<Contradiction> {
    graph
        .contradictions()
        .iter()
        .filter(|c| {
            [&c.label.node_a, &c.label.node_b]
                .into_iter()
                .any(|node| graph.class_id(node).is_some_and(|class| classes.contains(&class)))
        })
        .cloned()
        .collect()
}

fn rejected_seqs(graph: &ConstraintGraph) -> HashSet<u64> {
    graph.contradictions().iter().map(|c| c.seq).collect()
}
