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

//! Provides the foundational traits and data structures for agent telemetry.
//!
//! This module defines the abstract "what" of telemetry: hierarchical metric
//! identities, the mergeable statistics they accumulate, apdex
//! classification, sampler contracts and the custom events samplers may
//! emit. The `vigil-telemetry` crate provides the central service for
//! aggregating all of it, and `vigil-infra` the concrete collectors.

pub mod apdex;
pub mod event;
pub mod sampling;
pub mod stats;

pub use self::apdex::{apdex_bucket, ApdexBucket};
pub use self::event::CustomEvent;
pub use self::sampling::{Sample, Sampler, SamplerError, SamplerResult};
pub use self::stats::{MetricSpec, MetricStats, MetricsError, MetricsResult};
