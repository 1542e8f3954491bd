//! Feature values and their scalar resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weighted bag of candidate strings for one feature
pub type StringCounter = BTreeMap<String, u64>;

/// A stored feature: either a raw string or a string counter.
///
/// Wire form is untagged: `"foo"` or `{"foo": 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    String(String),
    Counter(StringCounter),
}

impl FeatureValue {
    /// Resolve to a single string.
    ///
    /// A counter resolves to its highest-weight key; ties go to the
    /// lexicographically smallest key. An empty counter has no value.
    pub fn resolve(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Counter(counter) => {
                let mut best: Option<(&String, u64)> = None;
                // BTreeMap iterates keys ascending, so a strict `>` keeps the
                // smallest key among equal weights.
                for (key, &weight) in counter {
                    if best.map_or(true, |(_, w)| weight > w) {
                        best = Some((key, weight));
                    }
                }
                best.map(|(key, _)| key.as_str())
            }
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<StringCounter> for FeatureValue {
    fn from(counter: StringCounter) -> Self {
        Self::Counter(counter)
    }
}

/// Feature name -> value for one content item.
///
/// Replaced wholesale on every put; never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCollection {
    features: BTreeMap<String, FeatureValue>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    /// The raw stored value, or `None` if absent
    pub fn feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    /// The resolved scalar value, or `None` if absent
    pub fn value(&self, name: &str) -> Option<&str> {
        self.features.get(name).and_then(FeatureValue::resolve)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
