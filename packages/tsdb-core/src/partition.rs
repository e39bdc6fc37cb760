//! Partition key derivation.
//!
//! `partition_key` maps one sample onto the 64-bit key the [`crate::ring`]
//! probes. It is a pure function: the same `(salt, bucket, series_hash)`
//! yields the same key on every node, which is what lets every node in the
//! cluster independently compute an identical replica set for a sample.

use chrono::{DateTime, Utc};

use crate::hash::xxhash64;
use crate::time::{utc_day_bucket, utc_day_bucket_from_millis};

/// Derives the partition key for one sample.
///
/// `salt` lets a caller force a different placement (intended for future
/// repair/migration tooling); it is normally empty. `end_of_bucket` is
/// truncated to its UTC calendar day. `series_hash` is the series'
/// fingerprint (see [`crate::series::Series::hash`]), added to the
/// salt-and-bucket hash so series within the same day disperse across the
/// ring instead of colliding on one node.
#[must_use]
pub fn partition_key(salt: &[u8], end_of_bucket: DateTime<Utc>, series_hash: u64) -> u64 {
    let bucket = utc_day_bucket(end_of_bucket);
    let mut base_input = Vec::with_capacity(salt.len() + bucket.len());
    base_input.extend_from_slice(salt);
    base_input.extend_from_slice(bucket.as_bytes());
    let base = xxhash64(&base_input);
    base.wrapping_add(series_hash)
}

/// Derives the partition key directly from a raw millisecond timestamp,
/// for callers that only have a wire sample on hand.
#[must_use]
pub fn partition_key_from_millis(salt: &[u8], timestamp_ms: i64, series_hash: u64) -> u64 {
    let bucket = utc_day_bucket_from_millis(timestamp_ms);
    let mut base_input = Vec::with_capacity(salt.len() + bucket.len());
    base_input.extend_from_slice(salt);
    base_input.extend_from_slice(bucket.as_bytes());
    xxhash64(&base_input).wrapping_add(series_hash)
}
