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

//! Apdex classification of transaction latency.
//!
//! Apdex buckets a response time into satisfying / tolerating / frustrating
//! relative to a target threshold T: up to T satisfies, up to 4T is
//! tolerated, anything beyond frustrates. An error frustrates regardless of
//! how fast it was produced.

/// The three-valued apdex satisfaction bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApdexBucket {
    /// The response arrived within the target threshold.
    Satisfying,
    /// The response took between T and 4T.
    Tolerating,
    /// The response took longer than 4T, or ended in an error.
    Frustrating,
}

/// Classifies one response into its apdex bucket.
///
/// Boundaries are inclusive on the better side: a duration exactly equal to
/// `threshold` satisfies, exactly `4 * threshold` tolerates.
pub fn apdex_bucket(duration: f64, is_error: bool, threshold: f64) -> ApdexBucket {
    if is_error {
        ApdexBucket::Frustrating
    } else if duration <= threshold {
        ApdexBucket::Satisfying
    } else if duration <= 4.0 * threshold {
        ApdexBucket::Tolerating
    } else {
        ApdexBucket::Frustrating
    }
}
