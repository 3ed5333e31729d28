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

//! A thread-safe registry for periodic samplers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use vigil_core::telemetry::event::CustomEvent;
use vigil_core::telemetry::sampling::{Sample, Sampler};

use crate::metrics::registry::MetricsRegistry;

/// Holds the samplers that survive the platform-capability gate and polls
/// them in registration order.
#[derive(Debug, Default)]
pub struct SamplerRegistry {
    samplers: Mutex<Vec<Box<dyn Sampler>>>,
    dropped_events: AtomicU64,
}

impl SamplerRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sampler if its platform predicate holds.
    ///
    /// The predicate is evaluated exactly once, here; an unsupported
    /// sampler is skipped with an info log, since absence of a capability
    /// is not an error. Returns whether the sampler was kept.
    pub fn register(&self, sampler: Box<dyn Sampler>) -> bool {
        let name = sampler.name().to_string();
        if !sampler.supported_on_this_platform() {
            log::info!("Sampler '{name}' not supported on this platform, skipping");
            return false;
        }
        self.lock().push(sampler);
        log::info!("Registered sampler: {name}");
        true
    }

    /// Number of registered samplers.
    pub fn sampler_count(&self) -> usize {
        self.lock().len()
    }

    /// Polls every registered sampler once, in registration order.
    ///
    /// Failures are isolated per sampler: a poll that errors is logged at
    /// debug severity, produces no observations for this cycle, and does
    /// not keep the remaining samplers from running. Observations go into
    /// `metrics` as unscoped rollups (samplers run outside any request
    /// context); custom events go into the `events` queue, and are counted
    /// rather than blocked on when the queue is full.
    pub fn poll_all(&self, metrics: &MetricsRegistry, events: &flume::Sender<CustomEvent>) {
        let mut samplers = self.lock();
        for sampler in samplers.iter_mut() {
            match sampler.poll() {
                Ok(samples) => {
                    for sample in samples {
                        self.forward(sample, metrics, events);
                    }
                }
                Err(e) => {
                    log::debug!("Sampler '{}' produced no data this cycle: {e}", sampler.name());
                }
            }
        }
    }

    /// Returns the number of events dropped since the last call, resetting
    /// the counter.
    pub fn take_dropped_events(&self) -> u64 {
        self.dropped_events.swap(0, Ordering::Relaxed)
    }

    fn forward(
        &self,
        sample: Sample,
        metrics: &MetricsRegistry,
        events: &flume::Sender<CustomEvent>,
    ) {
        match sample {
            Sample::Observation { name, value } => {
                if let Err(e) = metrics.record_unscoped(&name, value) {
                    log::warn!("Failed to record sampler observation '{name}': {e}");
                }
            }
            Sample::Event(event) => {
                if events.try_send(event).is_err() {
                    self.dropped_events.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn Sampler>>> {
        // A sampler that panicked mid-poll must not take the whole
        // registry with it for the rest of the process.
        match self.samplers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
