//! Concurrent appends and queries against one engine.
//!
//! Writers run on blocking threads while readers page through results; the
//! final state must hold every label and pass verification.
//!
//! Run with: `cargo test --test concurrency`

mod common;

use dossier::{DossierApi, Label, LabelFetcher, Node};
use tokio::task::JoinSet;

const WRITERS: usize = 8;
const LABELS_PER_WRITER: usize = 25;

fn writer_labels(writer: usize) -> Vec<Label> {
    (0..LABELS_PER_WRITER)
        .map(|i| {
            let annotator = format!("writer{}", writer);
            match i % 4 {
                // Chains within the writer's own items
                0 | 1 => Label::positive(
                    &format!("w{}-{}", writer, i),
                    &format!("w{}-{}", writer, i + 1),
                    annotator,
                ),
                // Links across writers through a shared hub
                2 => Label::positive("hub", &format!("w{}-{}", writer, i), annotator),
                _ => Label::negative(
                    &format!("w{}-{}", writer, i),
                    &format!("w{}-{}", (writer + 1) % WRITERS, i),
                    annotator,
                ),
            }
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_keep_graph_consistent() {
    let api: DossierApi = common::api();
    let mut tasks = JoinSet::new();

    for writer in 0..WRITERS {
        let api = api.clone();
        tasks.spawn_blocking(move || {
            for label in writer_labels(writer) {
                api.add_label(label).unwrap();
            }
        });
    }
    for _ in 0..4 {
        let api = api.clone();
        tasks.spawn_blocking(move || {
            for _ in 0..20 {
                let page = api.query(&LabelFetcher::new().cid("hub").perpage(5)).unwrap();
                assert!(page.len() <= 5);
                api.verify().unwrap();
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let engine = api.engine();
    assert_eq!(engine.label_count().unwrap(), WRITERS * LABELS_PER_WRITER);
    api.verify().unwrap();

    // Every writer's hub spoke ended up in the hub's class.
    let hub_class = engine.class_members(&Node::item("hub")).unwrap();
    for writer in 0..WRITERS {
        assert!(hub_class.contains(&Node::item(format!("w{}-2", writer))));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequence_numbers_are_unique_under_contention() {
    let api = common::api();
    let mut tasks = JoinSet::new();

    for writer in 0..WRITERS {
        let api = api.clone();
        tasks.spawn_blocking(move || {
            writer_labels(writer)
                .into_iter()
                .map(|label| api.add_label(label).unwrap().seq)
                .collect::<Vec<u64>>()
        });
    }

    let mut seqs = Vec::new();
    while let Some(result) = tasks.join_next().await {
        seqs.extend(result.unwrap());
    }
    let total = seqs.len();
    seqs.sort_unstable();
    seqs.dedup();
    assert_eq!(seqs.len(), total);
}
