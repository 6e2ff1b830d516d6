use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregator::{percentage, Aggregator, BucketStats};

/// Per-service slice of a [`Report`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    /// Keyed by hour stamp (`YYYY-MM-DD HH:00`), ascending.
    pub hours: BTreeMap<String, BucketStats>,
    /// Sum of every hour, including per-type roll-ups.
    pub totals: BucketStats,
}

/// Read-only snapshot of an analysis, handed to rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Only services with at least one counted event appear.
    pub services: BTreeMap<String, ServiceReport>,
    pub grand_total: BucketStats,
}

impl Report {
    /// Reduce aggregator state into per-service and global totals.
    ///
    /// Pure: the aggregator is only read, and building twice yields equal reports.
    pub fn build(aggregator: &Aggregator) -> Self {
        let mut services: BTreeMap<String, ServiceReport> = BTreeMap::new();

        for (key, stats) in aggregator.buckets() {
            if stats.is_empty() {
                continue;
            }
            let service = services.entry(key.service.clone()).or_default();
            service.totals.absorb(stats);
            service.hours.insert(key.hour.clone(), stats.clone());
        }

        let mut grand_total = BucketStats::default();
        for service in services.values() {
            grand_total.absorb(&service.totals);
        }

        Report {
            services,
            grand_total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Number of services with at least one counted event.
    pub fn active_services(&self) -> usize {
        self.services
            .values()
            .filter(|s| !s.totals.is_empty())
            .count()
    }

    /// Each success tag with its count and share of all successes.
    pub fn success_type_shares(&self) -> Vec<TypeShare> {
        shares(
            &self.grand_total.success_types,
            self.grand_total.success_count,
        )
    }

    /// Each error tag with its count and share of all errors.
    pub fn error_type_shares(&self) -> Vec<TypeShare> {
        shares(&self.grand_total.error_types, self.grand_total.error_count)
    }
}

/// One reason tag's count and its percentage of the relevant total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeShare {
    pub tag: String,
    pub count: u64,
    pub percent: f64,
}

fn shares(types: &BTreeMap<String, u64>, total: u64) -> Vec<TypeShare> {
    types
        .iter()
        .map(|(tag, &count)| TypeShare {
            tag: tag.clone(),
            count,
            percent: percentage(count, total),
        })
        .collect()
}
