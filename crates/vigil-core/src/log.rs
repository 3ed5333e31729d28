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

//! Logging seam for the agent.
//!
//! The agent logs through a small closed set of severities and a
//! single-method sink trait, so that messages captured before the real sink
//! exists can be replayed into it verbatim (see the startup buffer in
//! `vigil-telemetry`).

use std::fmt::Display;

/// The closed set of severities the agent logs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// The agent cannot continue.
    Fatal,
    /// An operation failed.
    Error,
    /// Something unexpected, the agent continues.
    Warn,
    /// Lifecycle information.
    Info,
    /// Diagnostic detail.
    Debug,
}

impl LogLevel {
    /// The lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// The closest level on the `log` facade.
    ///
    /// The facade has no fatal level; fatal maps to error.
    pub fn to_facade(&self) -> log::Level {
        match self {
            LogLevel::Fatal | LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A destination for agent log messages.
pub trait LogSink: Send + Sync {
    /// Delivers one message at the given severity.
    fn log(&self, level: LogLevel, message: &str);
}

/// A sink that forwards to the `log` facade macros.
#[derive(Debug, Default)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn log(&self, level: LogLevel, message: &str) {
        log::log!(level.to_facade(), "{message}");
    }
}
