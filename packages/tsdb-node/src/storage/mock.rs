//! In-memory [`Storage`] implementation backed by [`DashMap`].
//!
//! Stands in for the real columnar engine in tests: concurrent reads, and
//! enough out-of-order/duplicate-timestamp checking to exercise the
//! `LocalStore` contract.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tsdb_core::{Labels, Sample, Series};

use super::{Appender, Matcher, Querier, SeriesRef, Storage, StorageError};

type SeriesTable = DashMap<SeriesRef, (Labels, Vec<Sample>)>;

#[derive(Default)]
pub struct InMemoryEngine {
    series: Arc<SeriesTable>,
}

impl InMemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryEngine {
    fn appender(&self) -> Box<dyn Appender> {
        Box::new(MemAppender { engine: Arc::clone(&self.series), staged: HashMap::new() })
    }

    fn querier(&self, min_ts_ms: i64, max_ts_ms: i64) -> Box<dyn Querier> {
        let snapshot: Vec<(Labels, Vec<Sample>)> =
            self.series.iter().map(|entry| entry.value().clone()).collect();
        Box::new(MemQuerier { snapshot, min_ts_ms, max_ts_ms })
    }
}

struct MemAppender {
    engine: Arc<SeriesTable>,
    staged: HashMap<SeriesRef, (Labels, Vec<Sample>)>,
}

impl MemAppender {
    fn last_timestamp(&self, series_ref: SeriesRef) -> Option<i64> {
        self.staged
            .get(&series_ref)
            .and_then(|(_, samples)| samples.last())
            .map(|s| s.timestamp_ms)
            .or_else(|| {
                self.engine.get(&series_ref).and_then(|e| e.1.last().map(|s| s.timestamp_ms))
            })
    }

    fn push(&mut self, series_ref: SeriesRef, labels: Option<&Labels>, t_ms: i64, v: f64) -> Result<(), StorageError> {
        if let Some(last_ts) = self.last_timestamp(series_ref) {
            if t_ms < last_ts {
                return Err(StorageError::OutOfOrder { series_ref, timestamp_ms: t_ms });
            }
            if t_ms == last_ts {
                let existing = self
                    .staged
                    .get(&series_ref)
                    .and_then(|(_, s)| s.last())
                    .map(|s| s.value)
                    .or_else(|| self.engine.get(&series_ref).and_then(|e| e.1.last().map(|s| s.value)));
                if existing.is_some_and(|existing_v| existing_v != v) {
                    return Err(StorageError::DuplicateMismatch { series_ref, timestamp_ms: t_ms });
                }
            }
        }

        let engine = &self.engine;
        let entry = self.staged.entry(series_ref).or_insert_with(|| {
            let labels = labels
                .cloned()
                .or_else(|| engine.get(&series_ref).map(|e| e.0.clone()))
                .unwrap_or_else(|| Labels::from_pairs(Vec::new()));
            (labels, Vec::new())
        });
        entry.1.push(Sample::new(t_ms, v));
        Ok(())
    }
}

impl Appender for MemAppender {
    fn add(&mut self, labels: &Labels, t_ms: i64, v: f64) -> Result<SeriesRef, StorageError> {
        let series_ref = labels.hash();
        self.push(series_ref, Some(labels), t_ms, v)?;
        Ok(series_ref)
    }

    fn add_fast(&mut self, series_ref: SeriesRef, t_ms: i64, v: f64) -> Result<(), StorageError> {
        if !self.staged.contains_key(&series_ref) && !self.engine.contains_key(&series_ref) {
            return Err(StorageError::UnknownSeriesRef(series_ref));
        }
        self.push(series_ref, None, t_ms, v)
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        for (series_ref, (labels, mut new_samples)) in self.staged {
            let mut entry = self.engine.entry(series_ref).or_insert_with(|| (labels, Vec::new()));
            entry.1.append(&mut new_samples);
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}

struct MemQuerier {
    snapshot: Vec<(Labels, Vec<Sample>)>,
    min_ts_ms: i64,
    max_ts_ms: i64,
}

impl Querier for MemQuerier {
    fn select(&self, matchers: &[Matcher]) -> Box<dyn Iterator<Item = Series> + Send> {
        let min_ts_ms = self.min_ts_ms;
        let max_ts_ms = self.max_ts_ms;
        let matchers = matchers.to_vec();
        let mut out: Vec<Series> = self
            .snapshot
            .iter()
            .filter(|(labels, _)| matchers.iter().all(|m| m.matches(labels)))
            .map(|(labels, samples)| {
                let samples = samples
                    .iter()
                    .filter(|s| s.timestamp_ms >= min_ts_ms && s.timestamp_ms <= max_ts_ms)
                    .cloned()
                    .collect();
                Series { labels: labels.clone(), samples }
            })
            .collect();
        out.sort_by(|a, b| a.labels.as_slice().iter().map(|l| (&l.name, &l.value)).cmp(
            b.labels.as_slice().iter().map(|l| (&l.name, &l.value)),
        ));
        Box::new(out.into_iter())
    }
}
