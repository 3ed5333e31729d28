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

//! The concurrent metrics store.

use std::collections::HashMap;
use std::sync::RwLock;

use vigil_core::telemetry::apdex::ApdexBucket;
use vigil_core::telemetry::stats::{MetricSpec, MetricStats, MetricsError, MetricsResult};

/// Central store for metric statistics.
///
/// Entries are created lazily on first write; any string is a valid metric
/// name. All compound updates (read-modify-write of one accumulator) run
/// under the write lock, so concurrent recorders never lose updates and the
/// merge invariant of [`MetricStats`] holds under arbitrary interleaving.
///
/// This is the only shared mutable state in the telemetry core. Scope
/// stacks are per-context and never cross threads; samplers and request
/// handlers all funnel into this store.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    store: RwLock<HashMap<MetricSpec, MetricStats>>,
}

impl MetricsRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    fn with_entry<F>(&self, spec: MetricSpec, update: F) -> MetricsResult<()>
    where
        F: FnOnce(&mut MetricStats),
    {
        let mut store = self
            .store
            .write()
            .map_err(|_| MetricsError::StorageError("failed to acquire write lock".to_string()))?;
        update(store.entry(spec).or_default());
        Ok(())
    }

    /// Records a value against the global rollup for `name`.
    pub fn record_unscoped(&self, name: &str, value: f64) -> MetricsResult<()> {
        self.with_entry(MetricSpec::unscoped(name), |stats| stats.record(value))
    }

    /// Records a value against both the scoped entry and the unscoped
    /// rollup for `name`.
    pub fn record_scoped(&self, scope: &str, name: &str, value: f64) -> MetricsResult<()> {
        self.record_data_point(Some(scope), name, value, value)
    }

    /// Records a data point with distinct inclusive and exclusive values.
    ///
    /// When `scope` is given, the scoped entry and the unscoped rollup are
    /// updated under a single lock acquisition, so a harvest cannot observe
    /// one without the other.
    pub fn record_data_point(
        &self,
        scope: Option<&str>,
        name: &str,
        value: f64,
        exclusive: f64,
    ) -> MetricsResult<()> {
        let mut store = self
            .store
            .write()
            .map_err(|_| MetricsError::StorageError("failed to acquire write lock".to_string()))?;
        if let Some(scope) = scope {
            store
                .entry(MetricSpec::scoped(name, scope))
                .or_default()
                .record_data_point(value, exclusive);
        }
        store
            .entry(MetricSpec::unscoped(name))
            .or_default()
            .record_data_point(value, exclusive);
        Ok(())
    }

    /// Records one apdex classification against `spec`.
    pub fn record_apdex(
        &self,
        spec: &MetricSpec,
        bucket: ApdexBucket,
        threshold: f64,
    ) -> MetricsResult<()> {
        self.with_entry(spec.clone(), |stats| stats.record_apdex(bucket, threshold))
    }

    /// Returns a snapshot of the stats for `spec`.
    ///
    /// Unknown metrics yield a zero-valued accumulator; callers never need
    /// to pre-create an entry just to read it.
    pub fn lookup(&self, spec: &MetricSpec) -> MetricStats {
        if let Ok(store) = self.store.read() {
            store.get(spec).cloned().unwrap_or_default()
        } else {
            MetricStats::default()
        }
    }

    /// Returns a snapshot of the unscoped rollup for `name`.
    pub fn lookup_unscoped(&self, name: &str) -> MetricStats {
        self.lookup(&MetricSpec::unscoped(name))
    }

    /// Number of distinct entries currently stored.
    pub fn metric_count(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.metric_count() == 0
    }

    /// Clears all entries.
    ///
    /// A record that straddles the reset lands wholly in the window before
    /// or after it, never in both and never nowhere.
    pub fn reset(&self) -> MetricsResult<()> {
        let mut store = self
            .store
            .write()
            .map_err(|_| MetricsError::StorageError("failed to acquire write lock".to_string()))?;
        store.clear();
        Ok(())
    }

    /// Takes the current aggregation window: snapshot and reset in one
    /// critical section.
    pub fn harvest(&self) -> MetricsResult<Vec<(MetricSpec, MetricStats)>> {
        let mut store = self
            .store
            .write()
            .map_err(|_| MetricsError::StorageError("failed to acquire write lock".to_string()))?;
        Ok(std::mem::take(&mut *store).into_iter().collect())
    }

    /// Folds a previously harvested window back into the store.
    ///
    /// Used when a report could not be shipped: the window is merged into
    /// whatever has accumulated since, entry by entry.
    pub fn merge(&self, window: Vec<(MetricSpec, MetricStats)>) -> MetricsResult<()> {
        let mut store = self
            .store
            .write()
            .map_err(|_| MetricsError::StorageError("failed to acquire write lock".to_string()))?;
        for (spec, stats) in window {
            store.entry(spec).or_default().merge(&stats);
        }
        Ok(())
    }
}
