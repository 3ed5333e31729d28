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

//! The contract for periodic process-level pollers.
//!
//! "Sampling" is distinct from request instrumentation in that it actively
//! polls a process resource (resident memory, CPU, runtime statistics) on a
//! timer, independent of request traffic, whereas instrumented call sites
//! report discrete, event-based measurements.

use crate::telemetry::event::CustomEvent;
use std::borrow::Cow;
use std::fmt::{Debug, Display};

/// One unit of sampler output.
#[derive(Debug, Clone)]
pub enum Sample {
    /// A named numeric observation destined for the metrics store.
    Observation {
        /// The hierarchical metric name to record under.
        name: String,
        /// The observed value.
        value: f64,
    },
    /// A richer named + timestamped record destined for the event queue.
    Event(CustomEvent),
}

impl Sample {
    /// Convenience constructor for a metric observation.
    pub fn observation(name: impl Into<String>, value: f64) -> Self {
        Sample::Observation {
            name: name.into(),
            value,
        }
    }

    /// Convenience constructor for a custom event.
    pub fn event(event: CustomEvent) -> Self {
        Sample::Event(event)
    }
}

/// The core trait for a periodic poller.
///
/// A `Sampler` is a stateful object, typically living in `vigil-infra`,
/// that knows how to measure one process-level resource. The telemetry
/// service holds a collection of these and polls each one on a fixed
/// period for the lifetime of the process.
///
/// Implementations may perform I/O for the measurement itself (reading a
/// proc file, querying the OS) but must report failure through the returned
/// `Result` rather than panicking; a failed poll produces no observations
/// for that cycle and nothing else.
pub trait Sampler: Send + Debug + 'static {
    /// Returns a unique, human-readable identifier for this sampler.
    fn name(&self) -> Cow<'static, str>;

    /// Whether this sampler can run on the current platform.
    ///
    /// A pure capability check with no side effects, safe to call before
    /// any sampler state exists. Evaluated exactly once, at registration.
    fn supported_on_this_platform(&self) -> bool {
        true
    }

    /// Takes one measurement and returns its output.
    fn poll(&mut self) -> SamplerResult<Vec<Sample>>;
}

/// A specialized `Result` type for sampler operations.
pub type SamplerResult<T> = Result<T, SamplerError>;

/// An error produced by a sampler poll.
#[derive(Debug, Clone)]
pub enum SamplerError {
    /// The measured resource could not be reached this cycle.
    Unavailable(String),
    /// The measurement itself failed.
    Failed(String),
}

impl Display for SamplerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerError::Unavailable(msg) => write!(f, "resource unavailable: {msg}"),
            SamplerError::Failed(msg) => write!(f, "measurement failed: {msg}"),
        }
    }
}

impl std::error::Error for SamplerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TickSampler {
        ticks: u64,
    }

    impl Sampler for TickSampler {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("ticks")
        }

        fn poll(&mut self) -> SamplerResult<Vec<Sample>> {
            self.ticks += 1;
            Ok(vec![Sample::observation("Ticks/Total", self.ticks as f64)])
        }
    }

    #[test]
    fn test_sampler_trait_object() {
        let mut sampler: Box<dyn Sampler> = Box::new(TickSampler { ticks: 0 });
        assert_eq!(sampler.name(), "ticks");
        assert!(sampler.supported_on_this_platform());

        let samples = sampler.poll().unwrap();
        assert_eq!(samples.len(), 1);
        match &samples[0] {
            Sample::Observation { name, value } => {
                assert_eq!(name, "Ticks/Total");
                assert_eq!(*value, 1.0);
            }
            other => panic!("expected observation, got {other:?}"),
        }
    }
}
