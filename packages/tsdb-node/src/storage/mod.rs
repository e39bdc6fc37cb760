//! Storage engine trait seam and the process-wide append lock.
//!
//! The real engine (columnar block store, append/query) lives outside this
//! crate; this module only defines the capability set the writer and reader
//! need from it, plus a `LocalStore` façade that serializes commits behind
//! one mutex -- the engine does not support concurrent appenders.

pub mod mock;

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tsdb_core::{Labels, Sample, Series};

pub use mock::InMemoryEngine;

pub type SeriesRef = u64;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sample out of order for series {series_ref}: {timestamp_ms} <= last seen")]
    OutOfOrder { series_ref: SeriesRef, timestamp_ms: i64 },
    #[error("duplicate timestamp {timestamp_ms} for series {series_ref} with a different value")]
    DuplicateMismatch { series_ref: SeriesRef, timestamp_ms: i64 },
    #[error("series ref {0} is not known to this appender session")]
    UnknownSeriesRef(SeriesRef),
}

/// One label matcher used by `Querier::select`.
#[derive(Debug, Clone)]
pub struct Matcher {
    pub name: String,
    pub value: String,
    pub op: MatchOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Equal,
    NotEqual,
}

impl Matcher {
    #[must_use]
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), op: MatchOp::Equal }
    }

    #[must_use]
    pub fn matches(&self, labels: &Labels) -> bool {
        let actual = labels.get(&self.name).unwrap_or("");
        match self.op {
            MatchOp::Equal => actual == self.value,
            MatchOp::NotEqual => actual != self.value,
        }
    }
}

/// A scoped staging session on local storage, ending in exactly one
/// `commit` or `rollback`.
pub trait Appender: Send {
    /// Adds the first sample of a series, returning a ref for `add_fast`.
    fn add(&mut self, labels: &Labels, t_ms: i64, v: f64) -> Result<SeriesRef, StorageError>;

    /// Adds a subsequent sample for a series already seen via `add`.
    fn add_fast(&mut self, series_ref: SeriesRef, t_ms: i64, v: f64) -> Result<(), StorageError>;

    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    fn rollback(self: Box<Self>);
}

/// A single-pass, forward-only cursor over matched series.
pub trait Querier: Send {
    fn select(&self, matchers: &[Matcher]) -> Box<dyn Iterator<Item = Series> + Send>;
}

/// The external storage engine's capability set, as seen by this crate.
pub trait Storage: Send + Sync {
    fn appender(&self) -> Box<dyn Appender>;
    fn querier(&self, min_ts_ms: i64, max_ts_ms: i64) -> Box<dyn Querier>;
}

/// Serializes `Appender() -> Add*... -> Commit()` sessions behind a single
/// process-wide lock, since the storage engine does not allow concurrent
/// appenders. Held only for the duration of the local append -- callers
/// must release it before any remote fan-out I/O.
pub struct LocalStore {
    engine: Arc<dyn Storage>,
    commit_lock: Mutex<()>,
}

impl LocalStore {
    #[must_use]
    pub fn new(engine: Arc<dyn Storage>) -> Self {
        Self { engine, commit_lock: Mutex::new(()) }
    }

    /// Appends every `(labels, samples)` pair in one locked session and
    /// commits. Samples within one series are added in the order given.
    pub fn append_batch(&self, batch: &[(Labels, Vec<Sample>)]) -> Result<(), StorageError> {
        let _guard = self.commit_lock.lock();
        let mut appender = self.engine.appender();
        for (labels, samples) in batch {
            let mut samples = samples.iter();
            let Some(first) = samples.next() else { continue };
            let series_ref = appender.add(labels, first.timestamp_ms, first.value)?;
            for sample in samples {
                appender.add_fast(series_ref, sample.timestamp_ms, sample.value)?;
            }
        }
        appender.commit()
    }

    #[must_use]
    pub fn querier(&self, min_ts_ms: i64, max_ts_ms: i64) -> Box<dyn Querier> {
        self.engine.querier(min_ts_ms, max_ts_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsdb_core::{Label, Labels};

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        Labels::from_pairs(pairs.iter().map(|(n, v)| Label::new(*n, *v)))
    }

    #[test]
    fn append_batch_then_select_round_trips() {
        let store = LocalStore::new(Arc::new(InMemoryEngine::new()));
        let series_labels = labels(&[("__name__", "cpu"), ("host", "a")]);
        store
            .append_batch(&[(series_labels.clone(), vec![Sample::new(1000, 1.0), Sample::new(2000, 2.0)])])
            .unwrap();

        let querier = store.querier(0, i64::MAX);
        let results: Vec<Series> = querier.select(&[Matcher::equal("host", "a")]).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].samples.len(), 2);
    }

    #[test]
    fn out_of_order_sample_is_rejected() {
        let store = LocalStore::new(Arc::new(InMemoryEngine::new()));
        let series_labels = labels(&[("__name__", "cpu")]);
        store.append_batch(&[(series_labels.clone(), vec![Sample::new(2000, 1.0)])]).unwrap();

        let err = store.append_batch(&[(series_labels, vec![Sample::new(1000, 1.0)])]).unwrap_err();
        assert!(matches!(err, StorageError::OutOfOrder { .. }));
    }
}
