use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::classifier::Verdict;
use crate::request::AnalysisRequest;
use crate::timestamp::hour_stamp;

/// Counts for one `(service, hour)` bucket, or a roll-up of several.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub success_count: u64,
    pub error_count: u64,
    pub success_types: BTreeMap<String, u64>,
    pub error_types: BTreeMap<String, u64>,
}

impl BucketStats {
    pub fn total(&self) -> u64 {
        self.success_count + self.error_count
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Errors as a percentage of counted events; 0 when nothing was counted.
    pub fn error_rate(&self) -> f64 {
        percentage(self.error_count, self.total())
    }

    /// Successes as a percentage of counted events; 0 when nothing was counted.
    pub fn success_rate(&self) -> f64 {
        percentage(self.success_count, self.total())
    }

    /// Add every count in `other` into `self`.
    pub fn absorb(&mut self, other: &BucketStats) {
        self.success_count += other.success_count;
        self.error_count += other.error_count;
        for (tag, count) in &other.success_types {
            *self.success_types.entry(tag.clone()).or_insert(0) += count;
        }
        for (tag, count) in &other.error_types {
            *self.error_types.entry(tag.clone()).or_insert(0) += count;
        }
    }

    fn record_success(&mut self, tag: &str) {
        self.success_count += 1;
        *self.success_types.entry(tag.to_string()).or_insert(0) += 1;
    }

    fn record_error(&mut self, tag: &str) {
        self.error_count += 1;
        *self.error_types.entry(tag.to_string()).or_insert(0) += 1;
    }
}

impl Serialize for BucketStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BucketStats", 5)?;
        state.serialize_field("success_count", &self.success_count)?;
        state.serialize_field("error_count", &self.error_count)?;
        state.serialize_field("success_types", &self.success_types)?;
        state.serialize_field("error_types", &self.error_types)?;
        state.serialize_field("error_rate", &self.error_rate())?;
        state.end()
    }
}

/// `part` as a percentage of `whole`; 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub service: String,
    pub hour: String,
}

/// Owns every bucket for a run. The only place bucket counts change.
///
/// Buckets are created on the first counted event, so filtered-out and
/// `Neither` lines never leave an empty bucket behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregator {
    buckets: BTreeMap<BucketKey, BucketStats>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classified line. Returns whether any count changed.
    ///
    /// Every call is a fresh increment; feeding the same line twice counts
    /// it twice.
    pub fn update(
        &mut self,
        service: &str,
        timestamp: &NaiveDateTime,
        verdict: &Verdict,
        request: &AnalysisRequest,
    ) -> bool {
        match verdict {
            Verdict::Error(tag) if request.counts_error(tag) => {
                self.bucket(service, timestamp).record_error(tag);
                true
            }
            Verdict::Success(tag) if request.counts_success(tag) => {
                self.bucket(service, timestamp).record_success(tag);
                true
            }
            _ => false,
        }
    }

    /// Sum another aggregator's buckets into this one, key by key.
    pub fn merge(&mut self, other: Aggregator) {
        for (key, stats) in other.buckets {
            match self.buckets.get_mut(&key) {
                Some(existing) => existing.absorb(&stats),
                None => {
                    self.buckets.insert(key, stats);
                }
            }
        }
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, &BucketStats)> {
        self.buckets.iter()
    }

    pub fn get(&self, service: &str, hour: &str) -> Option<&BucketStats> {
        self.buckets.get(&BucketKey {
            service: service.to_string(),
            hour: hour.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn bucket(&mut self, service: &str, timestamp: &NaiveDateTime) -> &mut BucketStats {
        let key = BucketKey {
            service: service.to_string(),
            hour: hour_stamp(timestamp),
        };
        self.buckets.entry(key).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(at(0, 0), at(23, 59)).unwrap()
    }

    fn err(tag: &str) -> Verdict {
        Verdict::Error(tag.to_string())
    }

    fn ok(tag: &str) -> Verdict {
        Verdict::Success(tag.to_string())
    }

    #[test]
    fn test_update_buckets_by_hour() {
        let mut agg = Aggregator::new();
        let req = request();
        assert!(agg.update("fa-request", &at(10, 15), &ok("returnCode=0"), &req));
        assert!(agg.update("fa-request", &at(10, 59), &err("failed"), &req));
        assert!(agg.update("fa-request", &at(11, 0), &err("failed"), &req));

        let ten = agg.get("fa-request", "2025-01-01 10:00").unwrap();
        assert_eq!(ten.success_count, 1);
        assert_eq!(ten.error_count, 1);
        assert_eq!(ten.success_types.get("returnCode=0"), Some(&1));
        assert_eq!(ten.error_types.get("failed"), Some(&1));

        let eleven = agg.get("fa-request", "2025-01-01 11:00").unwrap();
        assert_eq!(eleven.total(), 1);
    }

    #[test]
    fn test_neither_does_not_create_bucket() {
        let mut agg = Aggregator::new();
        assert!(!agg.update("svc", &at(10, 0), &Verdict::Neither, &request()));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_filtered_error_leaves_bucket_untouched() {
        let mut agg = Aggregator::new();
        let req = request().with_error_filter("duplicate");
        assert!(!agg.update("svc", &at(10, 0), &err("failed"), &req));
        assert!(agg.get("svc", "2025-01-01 10:00").is_none());
        assert!(agg.update("svc", &at(10, 0), &err("duplicate_key"), &req));
        assert_eq!(agg.get("svc", "2025-01-01 10:00").unwrap().error_count, 1);
    }

    #[test]
    fn test_excluded_types_are_not_counted() {
        let mut agg = Aggregator::new();
        let req = request().with_log_type(crate::request::LogType::Success);
        assert!(!agg.update("svc", &at(10, 0), &err("ERROR"), &req));
        assert!(agg.update("svc", &at(10, 0), &ok("SUCCESS"), &req));
        assert_eq!(agg.get("svc", "2025-01-01 10:00").unwrap().error_count, 0);
    }

    #[test]
    fn test_merge_sums_overlapping_buckets() {
        let req = request();
        let mut left = Aggregator::new();
        left.update("a", &at(10, 0), &err("failed"), &req);
        left.update("a", &at(10, 5), &ok("SUCCESS"), &req);

        let mut right = Aggregator::new();
        right.update("a", &at(10, 30), &err("failed"), &req);
        right.update("b", &at(12, 0), &err("HTTP_504"), &req);

        left.merge(right);

        let a = left.get("a", "2025-01-01 10:00").unwrap();
        assert_eq!(a.error_count, 2);
        assert_eq!(a.error_types.get("failed"), Some(&2));
        assert_eq!(a.success_count, 1);
        assert_eq!(left.get("b", "2025-01-01 12:00").unwrap().error_count, 1);
    }

    #[test]
    fn test_rates() {
        let empty = BucketStats::default();
        assert_eq!(empty.error_rate(), 0.0);
        assert_eq!(empty.success_rate(), 0.0);

        let stats = BucketStats {
            success_count: 3,
            error_count: 1,
            ..Default::default()
        };
        assert_eq!(stats.error_rate(), 25.0);
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_serialized_stats_carry_error_rate() {
        let stats = BucketStats {
            success_count: 1,
            error_count: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["error_rate"], 50.0);
        assert_eq!(json["success_count"], 1);
    }
}
