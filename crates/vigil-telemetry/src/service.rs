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

//! Service tying the telemetry core together for the agent lifecycle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use vigil_core::telemetry::event::CustomEvent;
use vigil_core::telemetry::sampling::Sampler;
use vigil_core::telemetry::stats::{MetricSpec, MetricStats, MetricsResult};

use crate::metrics::apdex::{record_apdex, ApdexPolicy};
use crate::metrics::registry::MetricsRegistry;
use crate::sampling::SamplerRegistry;

/// Configuration for a telemetry service instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Seconds between sampler poll cycles.
    pub sample_interval_secs: f64,
    /// Capacity of the custom-event queue per harvest window.
    pub event_capacity: usize,
    /// Apdex targets.
    #[serde(default)]
    pub apdex: ApdexPolicy,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 10.0,
            event_capacity: 1000,
            apdex: ApdexPolicy::default(),
        }
    }
}

impl TelemetryConfig {
    /// Loads a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One aggregation window, ready for the transmission layer.
#[derive(Debug)]
pub struct Harvest {
    /// Every metric entry accumulated in the window.
    pub metrics: Vec<(MetricSpec, MetricStats)>,
    /// Custom events queued in the window.
    pub events: Vec<CustomEvent>,
    /// Events that did not fit in the queue this window.
    pub dropped_events: u64,
}

/// Owns the telemetry core for the lifetime of the agent.
///
/// Construct one at agent start and drop it at agent stop; nothing here is
/// process-global, so tests can run any number of isolated instances. The
/// host drives [`TelemetryService::tick`] periodically (the sampler poll
/// interval is enforced internally) and calls
/// [`TelemetryService::harvest`] once per reporting interval.
#[derive(Debug)]
pub struct TelemetryService {
    metrics: Arc<MetricsRegistry>,
    samplers: SamplerRegistry,
    apdex: ApdexPolicy,
    events_tx: flume::Sender<CustomEvent>,
    events_rx: flume::Receiver<CustomEvent>,
    last_poll: Instant,
    sample_interval: Duration,
}

impl TelemetryService {
    /// Creates a service from configuration.
    pub fn new(config: TelemetryConfig) -> Self {
        let (events_tx, events_rx) = flume::bounded(config.event_capacity);
        Self {
            metrics: Arc::new(MetricsRegistry::new()),
            samplers: SamplerRegistry::new(),
            apdex: config.apdex,
            events_tx,
            events_rx,
            last_poll: Instant::now(),
            sample_interval: Duration::from_secs_f64(config.sample_interval_secs),
        }
    }

    /// The shared metrics store.
    ///
    /// Clone the `Arc` into request contexts; their scope stacks record
    /// into it on pop.
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// The sampler registry, for registration at agent startup.
    pub fn sampler_registry(&self) -> &SamplerRegistry {
        &self.samplers
    }

    /// Registers a sampler, subject to its platform predicate.
    pub fn register_sampler(&self, sampler: Box<dyn Sampler>) -> bool {
        self.samplers.register(sampler)
    }

    /// A sender for custom events from outside the sampler path.
    pub fn event_sender(&self) -> flume::Sender<CustomEvent> {
        self.events_tx.clone()
    }

    /// Records the apdex outcome of one completed transaction, using the
    /// configured targets.
    pub fn record_apdex(
        &self,
        metric_key: &str,
        duration: f64,
        total_duration: f64,
        is_error: bool,
    ) -> MetricsResult<()> {
        record_apdex(
            &self.metrics,
            metric_key,
            duration,
            total_duration,
            is_error,
            &self.apdex,
        )
    }

    /// Should be called periodically by whatever owns the agent loop.
    /// Polls all samplers if the sample interval has passed.
    pub fn tick(&mut self) -> bool {
        if self.last_poll.elapsed() >= self.sample_interval {
            log::trace!("Polling all registered samplers...");
            self.samplers.poll_all(&self.metrics, &self.events_tx);
            self.last_poll = Instant::now();
            true
        } else {
            false
        }
    }

    /// Closes the current aggregation window and returns it.
    pub fn harvest(&self) -> MetricsResult<Harvest> {
        let metrics = self.metrics.harvest()?;
        let events: Vec<CustomEvent> = self.events_rx.try_iter().collect();
        let dropped_events = self.samplers.take_dropped_events();
        if dropped_events > 0 {
            log::warn!("{dropped_events} custom event(s) dropped this window (queue full)");
        }
        Ok(Harvest {
            metrics,
            events,
            dropped_events,
        })
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::thread;
    use vigil_core::telemetry::sampling::{Sample, SamplerResult};

    #[derive(Debug)]
    struct OneShotSampler;

    impl Sampler for OneShotSampler {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("oneshot")
        }

        fn poll(&mut self) -> SamplerResult<Vec<Sample>> {
            Ok(vec![
                Sample::observation("Memory/Physical", 128.0),
                Sample::event(CustomEvent::new("MemorySample").with_attribute("rss_mb", 128.0)),
            ])
        }
    }

    fn fast_config() -> TelemetryConfig {
        TelemetryConfig {
            sample_interval_secs: 0.05,
            event_capacity: 16,
            apdex: ApdexPolicy::new(1.0),
        }
    }

    #[test]
    fn test_tick_respects_the_sample_interval() {
        let mut service = TelemetryService::new(fast_config());
        service.register_sampler(Box::new(OneShotSampler));

        // Immediately after construction the interval has not passed.
        assert!(!service.tick());

        thread::sleep(Duration::from_millis(75));
        assert!(service.tick());
        // And not again right away.
        assert!(!service.tick());
    }

    #[test]
    fn test_harvest_returns_window_and_resets() {
        let mut service = TelemetryService::new(fast_config());
        service.register_sampler(Box::new(OneShotSampler));

        thread::sleep(Duration::from_millis(75));
        assert!(service.tick());
        service.metrics().record_unscoped("Controller/ping", 0.02).unwrap();

        let harvest = service.harvest().unwrap();
        assert_eq!(harvest.metrics.len(), 2);
        assert_eq!(harvest.events.len(), 1);
        assert_eq!(harvest.events[0].event_type, "MemorySample");
        assert_eq!(harvest.dropped_events, 0);

        let empty = service.harvest().unwrap();
        assert!(empty.metrics.is_empty());
        assert!(empty.events.is_empty());
    }

    #[test]
    fn test_apdex_uses_configured_targets() {
        let config = TelemetryConfig {
            apdex: ApdexPolicy::new(1.0).with_key_threshold("slow/txn", 4.0),
            ..TelemetryConfig::default()
        };
        let service = TelemetryService::new(config);

        service.record_apdex("slow/txn", 3.5, 3.5, false).unwrap();

        let keyed = service.metrics().lookup_unscoped("Apdex/slow/txn");
        assert_eq!(keyed.apdex_satisfying, 1);
        assert_eq!(keyed.min_call_time, 4.0);
    }

    #[test]
    fn test_config_from_json() {
        let config = TelemetryConfig::from_json(
            r#"{
                "sample_interval_secs": 30.0,
                "event_capacity": 64,
                "apdex": { "default_threshold": 2.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.sample_interval_secs, 30.0);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.apdex.default_threshold, 2.0);
    }

    #[test]
    fn test_isolated_instances_do_not_share_state() {
        let a = TelemetryService::default();
        let b = TelemetryService::default();

        a.metrics().record_unscoped("only/in/a", 1.0).unwrap();
        assert_eq!(a.metrics().lookup_unscoped("only/in/a").call_count, 1);
        assert_eq!(b.metrics().lookup_unscoped("only/in/a").call_count, 0);
    }
}
