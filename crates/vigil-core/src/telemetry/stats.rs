// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Metric identities and the mergeable statistical accumulator.

use crate::telemetry::apdex::ApdexBucket;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A unique identifier for one aggregation entry.
///
/// The `name` is a hierarchical `/`-separated path (e.g.
/// `ActiveRecord/find`, `Apdex/Controller/slow/txn`). A scoped entry
/// additionally carries the name of the call path it is attributed to; the
/// scoped entry and the unscoped rollup for the same name are distinct
/// aggregation entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricSpec {
    /// The hierarchical metric name.
    pub name: String,
    /// The call-path scope this entry is attributed to, if any.
    pub scope: Option<String>,
}

impl MetricSpec {
    /// Creates a spec for the global rollup of `name`.
    pub fn unscoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    /// Creates a spec attributed to a specific call path.
    pub fn scoped(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Some(scope.into()),
        }
    }

    /// Whether this entry is attributed to a call path.
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Iterates the `/`-separated segments of the metric name.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.name.split('/')
    }
}

impl Display for MetricSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{} ({})", self.name, scope),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A single mergeable statistical accumulator.
///
/// All time fields share one unit (seconds as `f64`). `min_call_time` and
/// `max_call_time` are meaningful only once at least one data point or
/// apdex classification has been recorded; see [`MetricStats::has_values`].
///
/// Two accumulators for the same [`MetricSpec`] can be merged in any order
/// and grouping without changing the result, which is what makes concurrent
/// aggregation windows well-defined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    /// Number of data points recorded.
    pub call_count: u64,
    /// Sum of all recorded values (inclusive time).
    pub total_call_time: f64,
    /// Sum of all recorded exclusive values (time not spent in children).
    pub total_exclusive_time: f64,
    /// Smallest recorded value. For apdex entries, the threshold used.
    pub min_call_time: f64,
    /// Largest recorded value. For apdex entries, the threshold used.
    pub max_call_time: f64,
    /// Sum of squared values, for later variance computation.
    pub sum_of_squares: f64,
    /// Count of responses classified as satisfying.
    pub apdex_satisfying: u64,
    /// Count of responses classified as tolerating.
    pub apdex_tolerating: u64,
    /// Count of responses classified as frustrating.
    pub apdex_frustrating: u64,
}

impl MetricStats {
    /// Creates a zero-valued accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one data point with distinct inclusive and exclusive values.
    pub fn record_data_point(&mut self, value: f64, exclusive: f64) {
        if self.has_values() {
            self.min_call_time = self.min_call_time.min(value);
            self.max_call_time = self.max_call_time.max(value);
        } else {
            self.min_call_time = value;
            self.max_call_time = value;
        }
        self.call_count += 1;
        self.total_call_time += value;
        self.total_exclusive_time += exclusive;
        self.sum_of_squares += value * value;
    }

    /// Records one data point whose exclusive time equals its value.
    pub fn record(&mut self, value: f64) {
        self.record_data_point(value, value);
    }

    /// Records one apdex classification.
    ///
    /// Min and max are set to the *threshold* that produced the
    /// classification, not the observed duration, so an apdex entry reports
    /// the target it was scored against.
    pub fn record_apdex(&mut self, bucket: ApdexBucket, threshold: f64) {
        match bucket {
            ApdexBucket::Satisfying => self.apdex_satisfying += 1,
            ApdexBucket::Tolerating => self.apdex_tolerating += 1,
            ApdexBucket::Frustrating => self.apdex_frustrating += 1,
        }
        self.min_call_time = threshold;
        self.max_call_time = threshold;
    }

    /// Total number of apdex classifications recorded.
    pub fn apdex_count(&self) -> u64 {
        self.apdex_satisfying + self.apdex_tolerating + self.apdex_frustrating
    }

    /// Whether min/max carry meaningful values.
    pub fn has_values(&self) -> bool {
        self.call_count > 0 || self.apdex_count() > 0
    }

    /// Whether nothing has been recorded yet.
    pub fn is_reset(&self) -> bool {
        !self.has_values()
    }

    /// Folds another accumulator into this one.
    ///
    /// Counts, totals and sums add; min takes the min of mins, max the max
    /// of maxes. Commutative and associative, so concurrent windows can be
    /// combined in any order.
    pub fn merge(&mut self, other: &MetricStats) {
        if other.has_values() {
            if self.has_values() {
                self.min_call_time = self.min_call_time.min(other.min_call_time);
                self.max_call_time = self.max_call_time.max(other.max_call_time);
            } else {
                self.min_call_time = other.min_call_time;
                self.max_call_time = other.max_call_time;
            }
        }
        self.call_count += other.call_count;
        self.total_call_time += other.total_call_time;
        self.total_exclusive_time += other.total_exclusive_time;
        self.sum_of_squares += other.sum_of_squares;
        self.apdex_satisfying += other.apdex_satisfying;
        self.apdex_tolerating += other.apdex_tolerating;
        self.apdex_frustrating += other.apdex_frustrating;
    }
}

/// A specialized `Result` type for metric-related operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics system.
#[derive(Debug, Clone)]
pub enum MetricsError {
    /// The shared store could not be accessed (a writer panicked while
    /// holding the lock).
    StorageError(String),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::StorageError(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_metric_spec_creation_and_display() {
        let rollup = MetricSpec::unscoped("ActiveRecord/find");
        assert!(!rollup.is_scoped());
        assert_eq!(rollup.to_string(), "ActiveRecord/find");
        assert_eq!(rollup.segments().collect::<Vec<_>>(), ["ActiveRecord", "find"]);

        let scoped = MetricSpec::scoped("ActiveRecord/find", "Controller/users/index");
        assert!(scoped.is_scoped());
        assert_eq!(scoped.to_string(), "ActiveRecord/find (Controller/users/index)");
        assert_ne!(rollup, scoped);
    }

    #[test]
    fn test_record_updates_all_fields() {
        let mut stats = MetricStats::new();
        assert!(stats.is_reset());

        stats.record(2.0);
        stats.record(1.0);
        stats.record(4.0);

        assert_eq!(stats.call_count, 3);
        assert_relative_eq!(stats.total_call_time, 7.0);
        assert_relative_eq!(stats.total_exclusive_time, 7.0);
        assert_relative_eq!(stats.min_call_time, 1.0);
        assert_relative_eq!(stats.max_call_time, 4.0);
        assert_relative_eq!(stats.sum_of_squares, 4.0 + 1.0 + 16.0);
    }

    #[test]
    fn test_exclusive_time_tracked_separately() {
        let mut stats = MetricStats::new();
        stats.record_data_point(1.0, 0.25);
        assert_relative_eq!(stats.total_call_time, 1.0);
        assert_relative_eq!(stats.total_exclusive_time, 0.25);
    }

    #[test]
    fn test_merge_is_commutative() {
        let mut a = MetricStats::new();
        a.record(1.0);
        a.record(3.0);
        let mut b = MetricStats::new();
        b.record(0.5);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.call_count, 3);
        assert_relative_eq!(ab.min_call_time, 0.5);
        assert_relative_eq!(ab.max_call_time, 3.0);
    }

    #[test]
    fn test_merge_is_associative() {
        let mut a = MetricStats::new();
        a.record(2.0);
        let mut b = MetricStats::new();
        b.record(5.0);
        let mut c = MetricStats::new();
        c.record(1.0);

        // (a + b) + c
        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);

        // a + (b + c)
        let mut bc = b.clone();
        bc.merge(&c);
        let mut right = a.clone();
        right.merge(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn test_merge_with_empty_keeps_min_max() {
        let mut a = MetricStats::new();
        a.record(2.0);
        let empty = MetricStats::new();

        a.merge(&empty);
        assert_relative_eq!(a.min_call_time, 2.0);
        assert_relative_eq!(a.max_call_time, 2.0);

        let mut fresh = MetricStats::new();
        fresh.merge(&a);
        assert_relative_eq!(fresh.min_call_time, 2.0);
        assert_relative_eq!(fresh.max_call_time, 2.0);
    }

    #[test]
    fn test_record_apdex_stores_threshold_in_min_and_max() {
        let mut stats = MetricStats::new();
        stats.record_apdex(ApdexBucket::Satisfying, 2.5);

        assert_eq!(stats.apdex_satisfying, 1);
        assert_eq!(stats.call_count, 0);
        assert_relative_eq!(stats.min_call_time, 2.5);
        assert_relative_eq!(stats.max_call_time, 2.5);
        assert!(stats.has_values());
    }

    #[test]
    fn test_merge_apdex_counters() {
        let mut a = MetricStats::new();
        a.record_apdex(ApdexBucket::Satisfying, 1.0);
        a.record_apdex(ApdexBucket::Frustrating, 1.0);
        let mut b = MetricStats::new();
        b.record_apdex(ApdexBucket::Tolerating, 1.0);

        a.merge(&b);
        assert_eq!(a.apdex_satisfying, 1);
        assert_eq!(a.apdex_tolerating, 1);
        assert_eq!(a.apdex_frustrating, 1);
        assert_eq!(a.apdex_count(), 3);
    }
}
