//! Fluent label queries with cursor pagination

use super::traverse;
use super::types::{Cursor, LabelPage, QueryError, Which};
use crate::graph::{DossierEngine, DossierResult, Label, LabelState, Node, SortKey, StoredLabel};
use std::collections::HashSet;

/// Query for fetching labels around a content item
///
/// Built by chaining; every call returns a new value. Validation happens
/// when the query runs.
///
/// ```
/// use dossier::{DossierEngine, Label, LabelFetcher};
///
/// let engine = DossierEngine::new();
/// engine.append_label(Label::positive("a", "b", "tester")).unwrap();
///
/// let page = LabelFetcher::new().cid("a").which("connected").get(&engine).unwrap();
/// assert!(page.contains(&Label::positive("a", "b", "tester")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelFetcher {
    /// Content id the anchors belong to
    pub content_id: Option<String>,
    /// Narrow the anchor to one sub-topic node
    pub subtopic_id: Option<String>,
    /// Predicate name, parsed at execution
    pub which: Option<String>,
    /// Maximum results per page
    pub perpage: Option<usize>,
    /// Resume strictly after this position
    pub after: Option<Cursor>,
}

impl LabelFetcher {
    /// Create a new empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor on a content item
    pub fn cid(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Anchor on one sub-topic of the content item
    pub fn subtopic(mut self, subtopic_id: impl Into<String>) -> Self {
        self.subtopic_id = Some(subtopic_id.into());
        self
    }

    /// Select result semantics: `connected`, `negative-inference`,
    /// `expanded` or `direct`
    pub fn which(mut self, predicate: impl Into<String>) -> Self {
        self.which = Some(predicate.into());
        self
    }

    /// Limit results per page
    pub fn perpage(mut self, perpage: usize) -> Self {
        self.perpage = Some(perpage);
        self
    }

    /// The page following `page`
    pub fn next(mut self, page: &LabelPage) -> Self {
        if let Some(cursor) = &page.cursor {
            self.after = Some(cursor.clone());
        }
        self
    }

    /// Resume after an explicit cursor
    pub fn after(mut self, cursor: Cursor) -> Self {
        self.after = Some(cursor);
        self
    }

    /// Execute against an engine
    pub fn get(&self, engine: &DossierEngine) -> DossierResult<LabelPage> {
        engine.query(self)
    }

    /// Execute against a snapshot of label state
    pub fn execute(&self, state: &LabelState) -> Result<LabelPage, QueryError> {
        let which = match self.which.as_deref() {
            Some(predicate) => predicate.parse()?,
            None => Which::default(),
        };
        if let Some(perpage) = self.perpage {
            if perpage == 0 {
                return Err(QueryError::InvalidPerPage(perpage));
            }
        }
        let content_id = self
            .content_id
            .as_deref()
            .ok_or(QueryError::MissingContentId)?;

        let graph = &state.graph;
        let anchors = traverse::anchors(graph, content_id, self.subtopic_id.as_deref());
        let mut classes = traverse::anchor_classes(graph, &anchors);

        let results: Vec<StoredLabel> = match which {
            Which::Direct => {
                let mut seen = HashSet::new();
                anchors
                    .iter()
                    .flat_map(|anchor| state.ledger.labels_touching(anchor))
                    .filter(|stored| seen.insert(stored.seq))
                    .collect()
            }
            Which::Connected => orient(traverse::class_pairs(state, &classes), &anchors),
            Which::Expanded => {
                classes = traverse::expanded_classes(graph, &anchors);
                orient(traverse::class_pairs(state, &classes), &anchors)
            }
            Which::NegativeInference => anchors
                .iter()
                .flat_map(|anchor| traverse::negative_inferences(state, anchor))
                .collect(),
        };

        let mut page = self.paginate(results);
        page.contradictions = traverse::contradictions_touching(graph, &classes);
        Ok(page)
    }

    fn paginate(&self, results: Vec<StoredLabel>) -> LabelPage {
        let mut keyed: Vec<(SortKey, Label)> = results
            .into_iter()
            .map(|stored| (stored.sort_key(), stored.label))
            .collect();
        keyed.sort_by(|x, y| x.0.cmp(&y.0));
        keyed.dedup_by(|x, y| x.0 == y.0);

        let start = match &self.after {
            Some(cursor) => keyed.partition_point(|(key, _)| key <= cursor.key()),
            None => 0,
        };
        let remaining = keyed.len() - start;
        let take = self.perpage.map_or(remaining, |n| n.min(remaining));

        let page: Vec<(SortKey, Label)> = keyed.into_iter().skip(start).take(take).collect();
        let cursor = match page.last() {
            Some((key, _)) => Some(Cursor::new(key.clone())),
            None => self.after.clone(),
        };

        LabelPage {
            labels: page.into_iter().map(|(_, label)| label).collect(),
            cursor,
            has_more: remaining > take,
            contradictions: Vec::new(),
        }
    }
}

/// Orient each label so an anchor it touches is `node_a`; labels touching no
/// anchor put their lesser endpoint first.
fn orient(labels: Vec<StoredLabel>, anchors: &[Node]) -> Vec<StoredLabel> {
    labels
        .into_iter()
        .map(|stored| match anchors.iter().find(|a| stored.label.touches(a)) {
            Some(anchor) => stored.oriented_from(anchor),
            None => stored.canonical(),
        })
        .collect()
}
