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

//! Resident memory sampler.

use std::borrow::Cow;

use sysinfo::{Pid, ProcessesToUpdate, System};
use vigil_core::telemetry::event::CustomEvent;
use vigil_core::telemetry::sampling::{Sample, Sampler, SamplerError, SamplerResult};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Samples the process's resident set size.
///
/// Each poll reports the `Memory/Physical` metric in megabytes and a
/// `MemorySample` event carrying the raw byte counts, peak included.
#[derive(Debug)]
pub struct MemorySampler {
    system: System,
    pid: Pid,
    peak_bytes: u64,
}

impl MemorySampler {
    /// Creates a sampler for the current process.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
            peak_bytes: 0,
        }
    }

    /// The highest resident size observed so far, in bytes.
    pub fn peak_bytes(&self) -> u64 {
        self.peak_bytes
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for MemorySampler {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("memory")
    }

    fn supported_on_this_platform(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    fn poll(&mut self) -> SamplerResult<Vec<Sample>> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| SamplerError::Unavailable("own process not visible".to_string()))?;

        let rss_bytes = process.memory();
        self.peak_bytes = self.peak_bytes.max(rss_bytes);

        Ok(vec![
            Sample::observation("Memory/Physical", rss_bytes as f64 / BYTES_PER_MB),
            Sample::event(
                CustomEvent::new("MemorySample")
                    .with_attribute("rss_bytes", rss_bytes as f64)
                    .with_attribute("peak_bytes", self.peak_bytes as f64),
            ),
        ])
    }
}
