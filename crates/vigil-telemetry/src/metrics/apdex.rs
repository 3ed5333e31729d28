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

//! Apdex recording policy: threshold resolution and the two aggregation
//! entries every completed transaction contributes to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use vigil_core::telemetry::apdex::apdex_bucket;
use vigil_core::telemetry::stats::{MetricSpec, MetricsResult};

use crate::metrics::registry::MetricsRegistry;

/// Name of the process-wide apdex rollup entry.
pub const APDEX_METRIC: &str = "Apdex";

/// Apdex target thresholds, in seconds.
///
/// Key transactions can carry their own target; everything else scores
/// against the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApdexPolicy {
    /// Target applied when no per-key override exists.
    pub default_threshold: f64,
    /// Per-transaction-key overrides.
    #[serde(default)]
    pub key_thresholds: HashMap<String, f64>,
}

impl Default for ApdexPolicy {
    fn default() -> Self {
        Self {
            default_threshold: 0.5,
            key_thresholds: HashMap::new(),
        }
    }
}

impl ApdexPolicy {
    /// Creates a policy with the given default target and no overrides.
    pub fn new(default_threshold: f64) -> Self {
        Self {
            default_threshold,
            key_thresholds: HashMap::new(),
        }
    }

    /// Adds a per-key target, returning the policy for chaining.
    pub fn with_key_threshold(mut self, key: impl Into<String>, threshold: f64) -> Self {
        self.key_thresholds.insert(key.into(), threshold);
        self
    }

    /// Loads a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The effective target for one transaction key.
    pub fn threshold_for(&self, key: &str) -> f64 {
        self.key_thresholds
            .get(key)
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// Records the apdex outcome of one completed transaction.
///
/// The process-wide `Apdex` entry is classified on the transaction's total
/// duration (queueing included), the per-key `Apdex/<key>` entry on the
/// action duration alone; both score against the same effective threshold.
/// Both entries store that threshold into min/max, so a report can show the
/// target alongside the score.
pub fn record_apdex(
    registry: &MetricsRegistry,
    metric_key: &str,
    duration: f64,
    total_duration: f64,
    is_error: bool,
    policy: &ApdexPolicy,
) -> MetricsResult<()> {
    let threshold = policy.threshold_for(metric_key);
    let rollup_bucket = apdex_bucket(total_duration, is_error, threshold);
    let key_bucket = apdex_bucket(duration, is_error, threshold);

    registry.record_apdex(&MetricSpec::unscoped(APDEX_METRIC), rollup_bucket, threshold)?;
    registry.record_apdex(
        &MetricSpec::unscoped(format!("{APDEX_METRIC}/{metric_key}")),
        key_bucket,
        threshold,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_threshold_resolution() {
        let policy = ApdexPolicy::new(1.0)
            .with_key_threshold("slow/txn", 4.0)
            .with_key_threshold("fast/txn", 0.1);

        assert_relative_eq!(policy.threshold_for("slow/txn"), 4.0);
        assert_relative_eq!(policy.threshold_for("fast/txn"), 0.1);
        assert_relative_eq!(policy.threshold_for("other/txn"), 1.0);
    }

    #[test]
    fn test_policy_from_json() {
        let policy = ApdexPolicy::from_json(
            r#"{ "default_threshold": 2.0, "key_thresholds": { "slow/txn": 4.0 } }"#,
        )
        .unwrap();
        assert_relative_eq!(policy.threshold_for("slow/txn"), 4.0);
        assert_relative_eq!(policy.threshold_for("anything/else"), 2.0);

        let bare = ApdexPolicy::from_json(r#"{ "default_threshold": 1.5 }"#).unwrap();
        assert!(bare.key_thresholds.is_empty());
    }

    #[test]
    fn test_key_transaction_counts_one_per_bucket() {
        let registry = MetricsRegistry::new();
        let policy = ApdexPolicy::new(1.0).with_key_threshold("slow/txn", 4.0);

        for duration in [3.5, 5.5, 16.5] {
            record_apdex(&registry, "slow/txn", duration, duration, false, &policy).unwrap();
        }

        let rollup = registry.lookup_unscoped("Apdex");
        assert_eq!(rollup.apdex_satisfying, 1);
        assert_eq!(rollup.apdex_tolerating, 1);
        assert_eq!(rollup.apdex_frustrating, 1);

        let keyed = registry.lookup_unscoped("Apdex/slow/txn");
        assert_eq!(keyed.apdex_satisfying, 1);
        assert_eq!(keyed.apdex_tolerating, 1);
        assert_eq!(keyed.apdex_frustrating, 1);

        // Both entries report the target, not the observed durations.
        assert_relative_eq!(rollup.min_call_time, 4.0);
        assert_relative_eq!(rollup.max_call_time, 4.0);
        assert_relative_eq!(keyed.min_call_time, 4.0);
        assert_relative_eq!(keyed.max_call_time, 4.0);
    }

    #[test]
    fn test_rollup_accumulates_across_keys() {
        let registry = MetricsRegistry::new();
        let policy = ApdexPolicy::new(1.0)
            .with_key_threshold("slow/txn", 4.0)
            .with_key_threshold("fast/txn", 0.1);

        for duration in [3.5, 5.5, 16.5] {
            record_apdex(&registry, "slow/txn", duration, duration, false, &policy).unwrap();
        }
        for duration in [0.05, 0.2, 0.5] {
            record_apdex(&registry, "fast/txn", duration, duration, false, &policy).unwrap();
        }
        for duration in [0.5, 2.0, 5.0] {
            record_apdex(&registry, "other/txn", duration, duration, false, &policy).unwrap();
        }

        let rollup = registry.lookup_unscoped("Apdex");
        assert_eq!(rollup.apdex_satisfying, 3);
        assert_eq!(rollup.apdex_tolerating, 3);
        assert_eq!(rollup.apdex_frustrating, 3);

        for key in ["slow/txn", "fast/txn", "other/txn"] {
            let keyed = registry.lookup_unscoped(&format!("Apdex/{key}"));
            assert_eq!(keyed.apdex_satisfying, 1, "key {key}");
            assert_eq!(keyed.apdex_tolerating, 1, "key {key}");
            assert_eq!(keyed.apdex_frustrating, 1, "key {key}");
        }
    }

    #[test]
    fn test_error_frustrates_both_entries() {
        let registry = MetricsRegistry::new();
        let policy = ApdexPolicy::new(2.0);

        record_apdex(&registry, "err/txn", 0.1, 0.1, true, &policy).unwrap();

        assert_eq!(registry.lookup_unscoped("Apdex").apdex_frustrating, 1);
        assert_eq!(registry.lookup_unscoped("Apdex/err/txn").apdex_frustrating, 1);
    }

    #[test]
    fn test_distinct_durations_classify_each_entry() {
        let registry = MetricsRegistry::new();
        let policy = ApdexPolicy::new(1.0);

        // Fast action, but the transaction as a whole (queueing included)
        // overran the tolerable window.
        record_apdex(&registry, "queued/txn", 0.5, 5.0, false, &policy).unwrap();

        assert_eq!(registry.lookup_unscoped("Apdex").apdex_frustrating, 1);
        assert_eq!(registry.lookup_unscoped("Apdex/queued/txn").apdex_satisfying, 1);
    }
}
