//! Must-link / cannot-link constraint graph
//!
//! Positive labels union nodes into equivalence classes (union-find with
//! path compression and union by size). Negative labels record cannot-link
//! relations between class representatives. A positive label that would
//! merge two cannot-linked classes is rejected and kept as a
//! [`Contradiction`]; so is a negative label inside a single class.

use super::label::{CorefValue, Label, StoredLabel};
use super::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Identifies an equivalence class by its current representative.
///
/// Only stable until the next merge; do not hold across appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(usize);

/// Why a label could not be applied to the class structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    /// Positive label across two classes that cannot link
    CannotLinkViolation,
    /// Negative label between two nodes of the same class
    SplitsClass,
}

/// A label whose effect on the class structure was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub seq: u64,
    pub label: Label,
    pub kind: ContradictionKind,
}

/// Detected breakage of the partition or cannot-link symmetry
#[derive(Debug, Error)]
#[error("constraint graph invariant violated: {0}")]
pub struct InvariantViolation(pub String);

/// Equivalence classes under positive labels plus cannot-link sets under
/// negative labels, maintained incrementally.
#[derive(Debug, Default)]
pub struct ConstraintGraph {
    /// Node -> interned index
    index: HashMap<Node, usize>,
    nodes: Vec<Node>,
    parent: Vec<usize>,
    /// Representative -> member indices
    members: HashMap<usize, Vec<usize>>,
    /// Representative -> representatives it cannot link with
    cannot_link: HashMap<usize, HashSet<usize>>,
    /// Content id -> every seen node with that content id
    by_content: HashMap<String, BTreeSet<Node>>,
    contradictions: Vec<Contradiction>,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one label. Returns the contradiction if the label was rejected.
    pub fn incorporate(&mut self, stored: &StoredLabel) -> Option<Contradiction> {
        let label = &stored.label;
        let a = self.intern(&label.node_a);
        let b = self.intern(&label.node_b);
        let ra = self.find(a);
        let rb = self.find(b);

        match label.value {
            CorefValue::Negative => {
                if ra == rb {
                    return Some(self.record(stored, ContradictionKind::SplitsClass));
                }
                self.cannot_link.entry(ra).or_default().insert(rb);
                self.cannot_link.entry(rb).or_default().insert(ra);
                None
            }
            CorefValue::Positive => {
                if ra == rb {
                    return None;
                }
                let forbidden = self
                    .cannot_link
                    .get(&ra)
                    .is_some_and(|links| links.contains(&rb));
                if forbidden {
                    return Some(self.record(stored, ContradictionKind::CannotLinkViolation));
                }
                self.union(ra, rb);
                None
            }
        }
    }

    /// Class of `node`, materializing a singleton class on first sight
    pub fn class_of(&mut self, node: &Node) -> ClassId {
        let i = self.intern(node);
        ClassId(self.find(i))
    }

    /// Class of `node` without materializing; `None` for unseen nodes
    pub fn class_id(&self, node: &Node) -> Option<ClassId> {
        self.index.get(node).map(|&i| ClassId(self.root(i)))
    }

    pub fn is_connected(&self, x: &Node, y: &Node) -> bool {
        if x == y {
            return true;
        }
        match (self.class_id(x), self.class_id(y)) {
            (Some(cx), Some(cy)) => cx == cy,
            _ => false,
        }
    }

    /// Sorted members of a class
    pub fn members(&self, class: ClassId) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .members
            .get(&class.0)
            .into_iter()
            .flatten()
            .map(|&i| self.nodes[i].clone())
            .collect();
        nodes.sort();
        nodes
    }

    /// Sorted members of the class containing `node` (just `node` if unseen)
    pub fn class_members(&self, node: &Node) -> Vec<Node> {
        match self.class_id(node) {
            Some(class) => self.members(class),
            None => vec![node.clone()],
        }
    }

    /// Classes that `class` cannot link with
    pub fn cannot_link_classes(&self, class: ClassId) -> Vec<ClassId> {
        let mut classes: Vec<ClassId> = self
            .cannot_link
            .get(&class.0)
            .into_iter()
            .flatten()
            .map(|&r| ClassId(r))
            .collect();
        classes.sort();
        classes
    }

    /// True if the classes of `x` and `y` are mutually cannot-linked
    pub fn are_cannot_linked(&self, x: &Node, y: &Node) -> bool {
        match (self.class_id(x), self.class_id(y)) {
            (Some(cx), Some(cy)) => self
                .cannot_link
                .get(&cx.0)
                .is_some_and(|links| links.contains(&cy.0)),
            _ => false,
        }
    }

    /// Every seen node whose class is cannot-linked with the class of `node`
    pub fn inferred_negatives(&self, node: &Node) -> BTreeSet<Node> {
        let Some(class) = self.class_id(node) else {
            return BTreeSet::new();
        };
        self.cannot_link_classes(class)
            .into_iter()
            .flat_map(|other| self.members(other))
            .collect()
    }

    /// Every unordered pair of distinct members, lesser node first
    pub fn all_pairs_in_class(&self, class: ClassId) -> Vec<(Node, Node)> {
        let members = self.members(class);
        let mut pairs = Vec::new();
        for (i, x) in members.iter().enumerate() {
            for y in &members[i + 1..] {
                pairs.push((x.clone(), y.clone()));
            }
        }
        pairs
    }

    /// Every seen node (whole-item and sub-topic) for a content id, sorted
    pub fn seen_nodes_of(&self, content_id: &str) -> Vec<Node> {
        self.by_content
            .get(content_id)
            .map(|nodes| nodes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contradictions(&self) -> &[Contradiction] {
        &self.contradictions
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn class_count(&self) -> usize {
        self.members.len()
    }

    /// Check the partition, member lists and cannot-link symmetry.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut seen = vec![false; self.nodes.len()];
        for (&rep, members) in &self.members {
            if self.parent[rep] != rep {
                return Err(InvariantViolation(format!(
                    "member list keyed by non-root {}",
                    self.nodes[rep]
                )));
            }
            for &m in members {
                if seen[m] {
                    return Err(InvariantViolation(format!(
                        "{} listed in two classes",
                        self.nodes[m]
                    )));
                }
                seen[m] = true;
                if self.root(m) != rep {
                    return Err(InvariantViolation(format!(
                        "{} listed under {} but rooted elsewhere",
                        self.nodes[m], self.nodes[rep]
                    )));
                }
            }
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(InvariantViolation(format!(
                "{} belongs to no class",
                self.nodes[missing]
            )));
        }

        for (&rep, links) in &self.cannot_link {
            if !self.members.contains_key(&rep) {
                return Err(InvariantViolation(format!(
                    "cannot-link set keyed by non-root {}",
                    self.nodes[rep]
                )));
            }
            for &other in links {
                if other == rep {
                    return Err(InvariantViolation(format!(
                        "class of {} cannot link with itself",
                        self.nodes[rep]
                    )));
                }
                let symmetric = self
                    .cannot_link
                    .get(&other)
                    .is_some_and(|back| back.contains(&rep));
                if !symmetric {
                    return Err(InvariantViolation(format!(
                        "cannot-link {} -> {} has no reverse",
                        self.nodes[rep], self.nodes[other]
                    )));
                }
            }
        }
        Ok(())
    }

    fn intern(&mut self, node: &Node) -> usize {
        if let Some(&i) = self.index.get(node) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(node.clone());
        self.parent.push(i);
        self.members.insert(i, vec![i]);
        self.index.insert(node.clone(), i);
        self.by_content
            .entry(node.content_id().to_string())
            .or_default()
            .insert(node.clone());
        i
    }

    /// Root of `i`, compressing the path behind it
    fn find(&mut self, i: usize) -> usize {
        let root = self.root(i);
        let mut current = i;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn root(&self, mut i: usize) -> usize {
        while self.parent[i] != i {
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, ra: usize, rb: usize) {
        let size_a = self.members.get(&ra).map_or(1, Vec::len);
        let size_b = self.members.get(&rb).map_or(1, Vec::len);
        let (keep, absorb) = if size_a >= size_b { (ra, rb) } else { (rb, ra) };

        self.parent[absorb] = keep;
        let absorbed = self.members.remove(&absorb).unwrap_or_default();
        self.members.entry(keep).or_default().extend(absorbed);

        // Remap every reference to the absorbed representative.
        if let Some(links) = self.cannot_link.remove(&absorb) {
            for other in links {
                if let Some(back) = self.cannot_link.get_mut(&other) {
                    back.remove(&absorb);
                    back.insert(keep);
                }
                self.cannot_link.entry(keep).or_default().insert(other);
            }
        }
    }

    fn record(&mut self, stored: &StoredLabel, kind: ContradictionKind) -> Contradiction {
        let contradiction = Contradiction {
            seq: stored.seq,
            label: stored.label.clone(),
            kind,
        };
        self.contradictions.push(contradiction.clone());
        contradiction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from(labels: Vec<Label>) -> (ConstraintGraph, Vec<Option<Contradiction>>) {
        let mut graph = ConstraintGraph::new();
        let outcomes = labels
            .into_iter()
            .enumerate()
            .map(|(seq, label)| graph.incorporate(&StoredLabel::new(seq as u64, label)))
            .collect();
        (graph, outcomes)
    }

    fn item(cid: &str) -> Node {
        Node::item(cid)
    }

    #[test]
    fn test_class_of_materializes_singleton() {
        let mut graph = ConstraintGraph::new();
        assert_eq!(graph.class_id(&item("a")), None);
        let class = graph.class_of(&item("a"));
        assert_eq!(graph.class_id(&item("a")), Some(class));
        assert_eq!(graph.members(class), vec![item("a")]);
        assert_eq!(graph.class_count(), 1);
    }

    #[test]
    fn test_positive_labels_are_transitive() {
        let (graph, _) = graph_from(vec![
            Label::positive("a", "b", "t"),
            Label::positive("b", "c", "t"),
        ]);
        assert!(graph.is_connected(&item("a"), &item("c")));
        assert!(graph.is_connected(&item("c"), &item("a")));
        assert_eq!(graph.class_members(&item("b")), vec![item("a"), item("b"), item("c")]);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn test_unseen_node_only_connected_to_itself() {
        let graph = ConstraintGraph::new();
        assert!(graph.is_connected(&item("z"), &item("z")));
        assert!(!graph.is_connected(&item("z"), &item("y")));
        assert_eq!(graph.class_members(&item("z")), vec![item("z")]);
    }

    #[test]
    fn test_negative_labels_are_symmetric() {
        let (graph, _) = graph_from(vec![Label::negative("x", "y", "t")]);
        assert!(!graph.is_connected(&item("x"), &item("y")));
        assert!(graph.are_cannot_linked(&item("x"), &item("y")));
        assert!(graph.are_cannot_linked(&item("y"), &item("x")));
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn test_cannot_link_propagates_through_merge() {
        let (graph, _) = graph_from(vec![
            Label::negative("b", "c", "t"),
            Label::positive("a", "b", "t"),
        ]);
        assert!(graph.are_cannot_linked(&item("a"), &item("c")));
        assert_eq!(
            graph.inferred_negatives(&item("a")),
            BTreeSet::from([item("c")])
        );
        assert_eq!(
            graph.inferred_negatives(&item("c")),
            BTreeSet::from([item("a"), item("b")])
        );
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn test_merge_unions_cannot_link_sets() {
        let (graph, _) = graph_from(vec![
            Label::negative("a", "x", "t"),
            Label::negative("b", "y", "t"),
            Label::positive("a", "b", "t"),
        ]);
        let class = graph.class_id(&item("a")).unwrap();
        let linked = graph.cannot_link_classes(class);
        assert_eq!(linked.len(), 2);
        assert!(linked.contains(&graph.class_id(&item("x")).unwrap()));
        assert!(linked.contains(&graph.class_id(&item("y")).unwrap()));
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn test_contradicting_positive_is_rejected() {
        let (graph, outcomes) = graph_from(vec![
            Label::positive("a", "b", "t"),
            Label::negative("b", "c", "t"),
            Label::positive("a", "c", "t"),
        ]);
        let contradiction = outcomes[2].clone().expect("merge should be rejected");
        assert_eq!(contradiction.kind, ContradictionKind::CannotLinkViolation);
        assert_eq!(contradiction.seq, 2);
        assert!(!graph.is_connected(&item("a"), &item("c")));
        assert_eq!(graph.contradictions().len(), 1);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn test_negative_inside_class_is_recorded_and_does_not_split() {
        let (graph, outcomes) = graph_from(vec![
            Label::positive("a", "b", "t"),
            Label::negative("a", "b", "t"),
        ]);
        assert_eq!(
            outcomes[1].as_ref().map(|c| c.kind),
            Some(ContradictionKind::SplitsClass)
        );
        assert!(graph.is_connected(&item("a"), &item("b")));
        assert!(!graph.are_cannot_linked(&item("a"), &item("b")));
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn test_incorporate_is_idempotent() {
        let labels = vec![
            Label::positive("a", "b", "t"),
            Label::negative("b", "c", "t"),
        ];
        let (once, _) = graph_from(labels.clone());
        let (twice, _) = graph_from(labels.iter().chain(labels.iter()).cloned().collect());

        for node in ["a", "b", "c"] {
            assert_eq!(once.class_members(&item(node)), twice.class_members(&item(node)));
            assert_eq!(once.inferred_negatives(&item(node)), twice.inferred_negatives(&item(node)));
        }
        assert_eq!(once.class_count(), twice.class_count());
        assert!(twice.contradictions().is_empty());
    }

    #[test]
    fn test_subtopics_of_same_item_are_not_linked() {
        let (graph, _) = graph_from(vec![
            Label::new(Node::subtopic("b", "b2"), Node::subtopic("c", "c3"), "t", CorefValue::Positive),
            Label::new(Node::subtopic("b", "b4"), Node::subtopic("c", "c5"), "t", CorefValue::Positive),
        ]);
        assert!(!graph.is_connected(&Node::subtopic("b", "b2"), &Node::subtopic("b", "b4")));
        assert!(!graph.is_connected(&Node::item("b"), &Node::subtopic("b", "b2")));
        assert_eq!(
            graph.seen_nodes_of("b"),
            vec![Node::subtopic("b", "b2"), Node::subtopic("b", "b4")]
        );
    }

    #[test]
    fn test_all_pairs_in_class() {
        let (graph, _) = graph_from(vec![
            Label::positive("a", "b", "t"),
            Label::positive("b", "c", "t"),
        ]);
        let class = graph.class_id(&item("a")).unwrap();
        assert_eq!(
            graph.all_pairs_in_class(class),
            vec![
                (item("a"), item("b")),
                (item("a"), item("c")),
                (item("b"), item("c")),
            ]
        );
    }

    #[test]
    fn test_large_chain_stays_consistent() {
        let labels: Vec<Label> = (0..200)
            .map(|i| Label::positive(&format!("n{}", i), &format!("n{}", i + 1), "t"))
            .chain((0..50).map(|i| Label::negative(&format!("n{}", i), &format!("m{}", i), "t")))
            .collect();
        let (graph, outcomes) = graph_from(labels);
        assert!(outcomes.iter().all(Option::is_none));
        assert_eq!(graph.class_members(&item("n0")).len(), 201);
        assert_eq!(graph.inferred_negatives(&item("n200")).len(), 50);
        assert!(graph.verify().is_ok());
    }
}
