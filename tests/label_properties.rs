//! Properties of the label engine that hold for any label sequence.
//!
//! Run with: `cargo test --test label_properties`

mod common;

use common::sub;
use dossier::{DossierEngine, Label, LabelFetcher, Node};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn engine_with(labels: &[Label]) -> DossierEngine {
    let engine = DossierEngine::new();
    for label in labels {
        engine.append_label(label.clone()).unwrap();
    }
    engine
}

fn positive_web() -> Vec<Label> {
    let mut labels = Vec::new();
    for i in 0..12 {
        labels.push(Label::positive(&format!("n{}", i), &format!("n{}", (i * 5 + 3) % 17), "tester"));
    }
    labels.push(Label::new(
        sub("n1", "s1"),
        Node::item("n40"),
        "tester",
        dossier::CorefValue::Positive,
    ));
    labels
}

fn all_nodes(labels: &[Label]) -> Vec<Node> {
    let mut nodes: Vec<Node> = labels
        .iter()
        .flat_map(|label| [label.node_a.clone(), label.node_b.clone()])
        .collect();
    nodes.sort();
    nodes.dedup();
    nodes
}

#[test]
fn test_positive_only_classes_ignore_append_order() {
    let labels = positive_web();
    let baseline = engine_with(&labels);
    let nodes = all_nodes(&labels);

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        let mut shuffled = labels.clone();
        shuffled.shuffle(&mut rng);
        let engine = engine_with(&shuffled);
        for node in &nodes {
            assert_eq!(
                engine.class_members(node).unwrap(),
                baseline.class_members(node).unwrap(),
                "class of {}",
                node
            );
        }
        engine.verify().unwrap();
    }
}

#[test]
fn test_repeating_a_label_changes_nothing_but_the_ledger() {
    let labels = vec![
        Label::positive("a", "b", "tester"),
        Label::negative("b", "c", "tester"),
    ];
    let once = engine_with(&labels);
    let twice = engine_with(&[labels.clone(), labels].concat());

    for node in ["a", "b", "c"].map(Node::item) {
        assert_eq!(once.class_members(&node).unwrap(), twice.class_members(&node).unwrap());
        assert_eq!(
            once.inferred_negatives(&node).unwrap(),
            twice.inferred_negatives(&node).unwrap()
        );
    }
    assert!(twice.contradictions().unwrap().is_empty());
    assert_eq!(twice.label_count().unwrap(), 4);
}

#[test]
fn test_labels_are_symmetric() {
    let forward = engine_with(&[Label::positive("a", "b", "tester"), Label::negative("b", "c", "tester")]);
    let backward = engine_with(&[Label::positive("b", "a", "tester"), Label::negative("c", "b", "tester")]);

    for node in ["a", "b", "c"].map(Node::item) {
        assert_eq!(forward.class_members(&node).unwrap(), backward.class_members(&node).unwrap());
        assert_eq!(
            forward.inferred_negatives(&node).unwrap(),
            backward.inferred_negatives(&node).unwrap()
        );
    }

    let from_a = LabelFetcher::new().cid("a").get(&forward).unwrap();
    let from_b = LabelFetcher::new().cid("b").get(&backward).unwrap();
    assert_eq!(from_a.labels[0].node_a, Node::item("a"));
    assert_eq!(from_b.labels[0].node_a, Node::item("b"));
}

#[test]
fn test_contradictions_never_merge_or_split() {
    let labels = vec![
        Label::negative("a", "b", "tester"),
        Label::positive("b", "c", "tester"),
        Label::positive("a", "c", "tester"),
        Label::positive("c", "d", "tester"),
        Label::negative("c", "d", "tester"),
    ];
    let engine = engine_with(&labels);
    let without = engine_with(&[labels[0].clone(), labels[1].clone(), labels[3].clone()]);

    assert_eq!(engine.contradictions().unwrap().len(), 2);
    for node in ["a", "b", "c", "d"].map(Node::item) {
        assert_eq!(engine.class_members(&node).unwrap(), without.class_members(&node).unwrap());
    }
    engine.verify().unwrap();
}

#[test]
fn test_cannot_link_sets_are_mutual() {
    let engine = engine_with(&[
        Label::positive("a", "b", "tester"),
        Label::negative("b", "c", "tester"),
        Label::positive("c", "d", "tester"),
    ]);
    for x in ["a", "b"].map(Node::item) {
        for y in ["c", "d"].map(Node::item) {
            assert!(engine.inferred_negatives(&x).unwrap().contains(&y));
            assert!(engine.inferred_negatives(&y).unwrap().contains(&x));
        }
    }
}
