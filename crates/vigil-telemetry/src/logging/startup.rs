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

//! Buffer-then-replay logging for agent startup.
//!
//! The agent produces log-worthy events before its real sink exists (the
//! sink may depend on configuration that is still being loaded). Rather
//! than lose them, they are trapped in memory and replayed once, in order,
//! when the sink arrives. The drain is a one-time cutover: after it, the
//! buffer forwards straight to the `log` facade instead of accumulating
//! again, so no entry can be appended "during" the drain and lost.

use std::sync::Mutex;

use vigil_core::log::{FacadeSink, LogLevel, LogSink};

#[derive(Debug, Default)]
struct BufferState {
    entries: Vec<(LogLevel, String)>,
    drained: bool,
}

/// Captures log events until a real sink exists, then replays them once.
#[derive(Debug, Default)]
pub struct StartupEventBuffer {
    state: Mutex<BufferState>,
}

impl StartupEventBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry in call order. Never blocks, never drops.
    ///
    /// After the buffer has been drained, entries go straight to the `log`
    /// facade; the cutover to the real sink has already happened.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.lock();
        if state.drained {
            drop(state);
            FacadeSink.log(level, &message);
            return;
        }
        state.entries.push((level, message));
    }

    /// Replays every buffered entry into `sink` in FIFO order, then leaves
    /// the buffer permanently empty.
    ///
    /// Draining an already-drained (or empty) buffer is a no-op. The
    /// replay runs under the buffer lock, so an `append` racing the drain
    /// is ordered wholly before it (and gets replayed) or wholly after it
    /// (and goes to the facade).
    pub fn drain_into(&self, sink: &dyn LogSink) {
        let mut state = self.lock();
        for (level, message) in state.entries.drain(..) {
            sink.log(level, &message);
        }
        state.drained = true;
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferState> {
        // Startup logging must outlive a panicking thread elsewhere.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
