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

//! Custom event payloads for richer sampler output.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A named, timestamped set of numeric attributes.
///
/// Samplers that report more than a single gauge per poll (a whole
/// process-statistics snapshot, say) emit one of these instead of a list of
/// separate metric observations. The aggregation service queues events
/// until harvest; their schema is handed as-is to the transmission layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    /// The event type (e.g. "MemorySample").
    pub event_type: String,
    /// Seconds since the Unix epoch at which the event was captured.
    pub timestamp: f64,
    /// Named numeric attributes, in insertion order.
    pub attributes: Vec<(String, f64)>,
}

impl CustomEvent {
    /// Creates an event stamped with the current wall-clock time.
    pub fn new(event_type: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            event_type: event_type.into(),
            timestamp,
            attributes: Vec::new(),
        }
    }

    /// Adds a numeric attribute, returning the event for chaining.
    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.push((name.into(), value));
        self
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = CustomEvent::new("MemorySample")
            .with_attribute("rss_bytes", 1024.0)
            .with_attribute("peak_bytes", 2048.0);

        assert_eq!(event.event_type, "MemorySample");
        assert!(event.timestamp > 0.0);
        assert_eq!(event.attribute("rss_bytes"), Some(1024.0));
        assert_eq!(event.attribute("peak_bytes"), Some(2048.0));
        assert_eq!(event.attribute("missing"), None);
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = CustomEvent::new("GcStats").with_attribute("heap_live", 42.0);
        let json = serde_json::to_string(&event).unwrap();
        let back: CustomEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
