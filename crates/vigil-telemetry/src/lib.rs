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

//! Telemetry aggregation for the Vigil monitoring agent.
//!
//! This crate turns the contracts of `vigil-core` into a running service:
//! a concurrent metrics store fed by instrumented call sites, per-request
//! scope tracking with exclusive-time accounting, apdex recording, a
//! registry of periodic samplers, and the startup log buffer that holds
//! messages until a real sink exists. Everything is an explicitly
//! constructed value: build a [`TelemetryService`] at agent start, drop it
//! at agent stop, and tests can hold as many isolated instances as they
//! like.

pub mod logging;
pub mod metrics;
pub mod sampling;
pub mod service;

pub use logging::StartupEventBuffer;
pub use metrics::apdex::{record_apdex, ApdexPolicy, APDEX_METRIC};
pub use metrics::registry::MetricsRegistry;
pub use metrics::scope::{ScopeError, ScopeHandle, ScopeStack, TracedScope};
pub use sampling::SamplerRegistry;
pub use service::{Harvest, TelemetryConfig, TelemetryService};
