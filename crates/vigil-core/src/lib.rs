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

//! Foundational traits, core types, and interface contracts for the Vigil
//! monitoring agent.
//!
//! This crate defines the "common language" of the agent's telemetry core:
//! the statistical accumulator every metric aggregates into, the apdex
//! classification, the contract a periodic sampler must fulfil, and the
//! logging seam used during agent startup. It contains no aggregation logic
//! itself; `vigil-telemetry` provides the central service that consumes
//! these contracts, and `vigil-infra` provides the platform-specific
//! collectors that implement them.

pub mod log;
pub mod telemetry;
pub mod utils;

pub use telemetry::{
    apdex_bucket, ApdexBucket, CustomEvent, MetricSpec, MetricStats, MetricsError, MetricsResult,
    Sample, Sampler, SamplerError, SamplerResult,
};
