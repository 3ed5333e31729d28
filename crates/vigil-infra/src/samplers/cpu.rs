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

//! Process CPU utilization sampler.

use std::borrow::Cow;

use sysinfo::{Pid, ProcessesToUpdate, System};
use vigil_core::telemetry::sampling::{Sample, Sampler, SamplerError, SamplerResult};

/// Samples the process's CPU utilization as a percentage of one core.
///
/// Utilization is a rate between two measurements, so the first poll only
/// primes the baseline and yields no observation.
#[derive(Debug)]
pub struct CpuSampler {
    system: System,
    pid: Pid,
    primed: bool,
}

impl CpuSampler {
    /// Creates a sampler for the current process.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
            primed: false,
        }
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for CpuSampler {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("cpu")
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

        let utilization = process.cpu_usage();
        if !self.primed {
            self.primed = true;
            return Ok(Vec::new());
        }

        Ok(vec![Sample::observation(
            "CPU/Utilization",
            f64::from(utilization),
        )])
    }
}
