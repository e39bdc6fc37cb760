//! Calendar-day time bucketing.
//!
//! A sample's time bucket is the UTC calendar day containing its timestamp.
//! Two samples in the same UTC day land in the same bucket and therefore on
//! the same replica set, giving a day's worth of one series temporal
//! locality on disk.

use chrono::{DateTime, Utc};

/// Derives the `YYYYMMDD` bucket string for `at`.
#[must_use]
pub fn utc_day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Derives the bucket string for a raw millisecond Unix timestamp.
#[must_use]
pub fn utc_day_bucket_from_millis(timestamp_ms: i64) -> String {
    let at = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or_default();
    utc_day_bucket(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_day_same_bucket() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(utc_day_bucket(morning), utc_day_bucket(night));
    }

    #[test]
    fn different_days_different_bucket() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        assert_ne!(utc_day_bucket(day1), utc_day_bucket(day2));
    }

    #[test]
    fn format_is_eight_digits() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let bucket = utc_day_bucket(at);
        assert_eq!(bucket.len(), 8);
        assert_eq!(bucket, "20240301");
    }

    #[test]
    fn from_millis_matches_datetime() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let millis = at.timestamp_millis();
        assert_eq!(utc_day_bucket(at), utc_day_bucket_from_millis(millis));
    }
}
