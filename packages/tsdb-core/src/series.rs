//! The label/sample model shared by the writer and reader fan-out paths.

use serde::{Deserialize, Serialize};

use crate::hash::xxhash64;

/// A single `name=value` label pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// A sorted, deduplicated label set.
///
/// Labels are sorted stably by name; labels with an empty value are dropped
/// on construction, matching the external write path's rebuild of the
/// label set from the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels(Vec<Label>);

impl Labels {
    /// Builds a canonical label set from arbitrary, possibly-unsorted input.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = Label>) -> Self {
        let mut labels: Vec<Label> = pairs.into_iter().filter(|l| !l.value.is_empty()).collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        labels.dedup_by(|a, b| a.name == b.name);
        Self(labels)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Label] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|l| l.name == name).map(|l| l.value.as_str())
    }

    /// 64-bit fingerprint of this label set. Two label sets with identical
    /// `(name, value)` pairs in the same order hash identically; collisions
    /// across distinct label sets are treated as undefined behavior per the
    /// storage contract, not guarded against here.
    #[must_use]
    pub fn hash(&self) -> u64 {
        let mut buf = Vec::new();
        for label in &self.0 {
            buf.extend_from_slice(label.name.as_bytes());
            buf.push(0);
            buf.extend_from_slice(label.value.as_bytes());
            buf.push(0);
        }
        xxhash64(&buf)
    }
}

/// One `(timestamp_ms, value)` pair. Timestamps are wall-clock milliseconds
/// since the Unix epoch; samples are appended, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
}

impl Sample {
    #[must_use]
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self { timestamp_ms, value }
    }
}

/// A labeled, time-ordered sequence of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: Labels,
    pub samples: Vec<Sample>,
}

impl Series {
    #[must_use]
    pub fn new(labels: Labels) -> Self {
        Self { labels, samples: Vec::new() }
    }

    #[must_use]
    pub fn hash(&self) -> u64 {
        self.labels.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_sorted_stably_by_name() {
        let labels = Labels::from_pairs([
            Label::new("z", "1"),
            Label::new("a", "2"),
            Label::new("m", "3"),
        ]);
        let names: Vec<&str> = labels.as_slice().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "m", "z"]);
    }

    #[test]
    fn empty_values_dropped() {
        let labels = Labels::from_pairs([Label::new("a", ""), Label::new("b", "1")]);
        assert_eq!(labels.as_slice().len(), 1);
        assert_eq!(labels.get("b"), Some("1"));
        assert_eq!(labels.get("a"), None);
    }

    #[test]
    fn duplicate_names_deduplicated() {
        let labels = Labels::from_pairs([Label::new("a", "1"), Label::new("a", "2")]);
        assert_eq!(labels.as_slice().len(), 1);
    }

    #[test]
    fn hash_is_deterministic() {
        let a = Labels::from_pairs([Label::new("__name__", "cpu"), Label::new("host", "n1")]);
        let b = Labels::from_pairs([Label::new("host", "n1"), Label::new("__name__", "cpu")]);
        assert_eq!(a.hash(), b.hash(), "construction order must not affect the canonical hash");
    }

    #[test]
    fn distinct_label_sets_differ() {
        let a = Labels::from_pairs([Label::new("__name__", "cpu")]);
        let b = Labels::from_pairs([Label::new("__name__", "mem")]);
        assert_ne!(a.hash(), b.hash());
    }
}
