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

use std::time::{Duration, Instant};

/// A monotonic stopwatch that starts on creation.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start_time: Option<Instant>,
}

impl Stopwatch {
    /// Creates a new stopwatch and starts it immediately.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
        }
    }

    /// Returns the elapsed time since the stopwatch was started, or `None`
    /// if it has not been started.
    #[inline]
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|start| start.elapsed())
    }

    /// Returns the elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed().map(|d| d.as_millis() as u64)
    }

    /// Returns the elapsed time in seconds as `f64`.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_secs_f64())
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn stopwatch_creation_starts_timer() {
        let watch = Stopwatch::new();
        assert!(watch.elapsed().is_some());
        assert!(watch.elapsed_ms().is_some());
        assert!(watch.elapsed_secs_f64().is_some());
    }

    #[test]
    fn stopwatch_elapsed_time_after_delay() {
        let watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(50));

        let elapsed = watch.elapsed().expect("should have elapsed duration");
        assert!(
            elapsed >= Duration::from_millis(50),
            "elapsed ({elapsed:?}) should cover the sleep"
        );
        assert!(
            elapsed < Duration::from_millis(250),
            "elapsed ({elapsed:?}) should not wildly exceed the sleep"
        );
    }

    #[test]
    fn stopwatch_implements_default() {
        let watch = Stopwatch::default();
        assert!(watch.elapsed().is_some());
    }
}
