//! `MergeSeriesSet` semantics: union same-labeled series across peers,
//! label-sorted output, later value wins on a timestamp collision.

use std::collections::{BTreeMap, HashMap};

use tsdb_core::{Sample, Series};

/// Merges per-peer series sets (local querier first, then each remote, in
/// the order their results arrived) into one label-sorted, deduplicated
/// series set.
#[must_use]
pub fn merge_series_sets(sets: Vec<Vec<Series>>) -> Vec<Series> {
    let mut merged: HashMap<u64, (Series, BTreeMap<i64, f64>)> = HashMap::new();

    for set in sets {
        for series in set {
            let key = series.labels.hash();
            let samples: BTreeMap<i64, f64> = series.samples.iter().map(|s| (s.timestamp_ms, s.value)).collect();
            let entry = merged.entry(key).or_insert_with(|| (Series::new(series.labels.clone()), BTreeMap::new()));
            for (t, v) in samples {
                entry.1.insert(t, v);
            }
        }
    }

    let mut out: Vec<Series> = merged
        .into_values()
        .map(|(series, samples)| Series {
            labels: series.labels,
            samples: samples.into_iter().map(|(t, v)| Sample::new(t, v)).collect(),
        })
        .collect();

    out.sort_by(|a, b| {
        let a_key = a.labels.as_slice().iter().map(|l| (&l.name, &l.value));
        let b_key = b.labels.as_slice().iter().map(|l| (&l.name, &l.value));
        a_key.cmp(b_key)
    });
    out
}
