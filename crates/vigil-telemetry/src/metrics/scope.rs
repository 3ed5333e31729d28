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

//! Per-context scope tracking with exclusive-time accounting.
//!
//! Every logical unit of work (one inbound request, say) owns its own
//! [`ScopeStack`]. Instrumented call sites push a scope when they start and
//! pop it when they finish; on pop the elapsed time is attributed to a
//! metric, scoped under the enclosing call path, and the enclosing scope
//! learns how much of its own time was really spent in the child. The
//! stack uses interior mutability and is deliberately not `Sync`: a
//! context's stack never crosses threads, so only the shared
//! [`MetricsRegistry`] needs synchronization.

use std::cell::{Cell, RefCell};
use std::fmt::Display;

use vigil_core::telemetry::stats::MetricsResult;
use vigil_core::utils::Stopwatch;

use crate::metrics::registry::MetricsRegistry;

/// One nested unit of work on a context's stack.
#[derive(Debug)]
struct Scope {
    name: String,
    start_time: f64,
    children_time: f64,
    token: u64,
}

/// An opaque reference to one exact stack entry.
///
/// The handle encodes both the entry's depth and a token unique within its
/// stack, so a pop with a stale or out-of-order handle is detected rather
/// than silently popping the wrong scope (scopes can nest with repeated
/// names, so a name alone would not identify the entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeHandle {
    depth: usize,
    token: u64,
}

/// The per-context stack of active scopes.
///
/// Timestamps are `f64` seconds on the caller's own monotonic timeline;
/// only differences between a scope's start and end ever matter, so any
/// consistent origin works.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: RefCell<Vec<Scope>>,
    next_token: Cell<u64>,
}

impl ScopeStack {
    /// Creates an empty stack for a new execution context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new innermost scope starting at `start_time`.
    pub fn push(&self, name: &str, start_time: f64) -> ScopeHandle {
        let token = self.next_token.get();
        self.next_token.set(token + 1);

        let mut frames = self.frames.borrow_mut();
        frames.push(Scope {
            name: name.to_string(),
            start_time,
            children_time: 0.0,
            token,
        });
        ScopeHandle {
            depth: frames.len() - 1,
            token,
        }
    }

    /// Pops the scope referenced by `handle` and attributes its time.
    ///
    /// The inclusive duration (`end_time` minus the scope's start) is
    /// recorded under `metric_name`, scoped to the enclosing scope's name
    /// when one exists, together with the unscoped rollup. The exclusive
    /// portion excludes time already attributed to children. The enclosing
    /// scope, if any, accrues the popped scope's inclusive duration into
    /// its own children time.
    ///
    /// A handle that is not the top of the stack is a programming defect in
    /// the instrumentation: the offending scopes are discarded, nothing is
    /// recorded for them, and the defect is reported through the returned
    /// error.
    pub fn pop(
        &self,
        registry: &MetricsRegistry,
        handle: ScopeHandle,
        metric_name: &str,
        end_time: f64,
    ) -> Result<(), ScopeError> {
        let mut frames = self.frames.borrow_mut();
        let top = match frames.len().checked_sub(1) {
            Some(top) => top,
            None => return Err(ScopeError::EmptyStack),
        };

        if handle.depth > top || frames[handle.depth].token != handle.token {
            return Err(ScopeError::StaleHandle);
        }

        if handle.depth < top {
            let discarded = top - handle.depth;
            let scope = frames[handle.depth].name.clone();
            frames.truncate(handle.depth);
            log::warn!(
                "Unbalanced pop of scope '{scope}': discarded {discarded} unclosed nested scope(s)"
            );
            return Err(ScopeError::UnbalancedPop { scope, discarded });
        }

        let frame = match frames.pop() {
            Some(frame) => frame,
            None => return Err(ScopeError::EmptyStack),
        };
        let inclusive = end_time - frame.start_time;
        let exclusive = (inclusive - frame.children_time).max(0.0);
        let parent = frames.last_mut().map(|parent| {
            parent.children_time += inclusive;
            parent.name.clone()
        });
        drop(frames);

        if let Err(e) = registry.record_data_point(parent.as_deref(), metric_name, inclusive, exclusive)
        {
            log::warn!("Failed to record scope metric '{metric_name}': {e}");
        }
        Ok(())
    }

    /// Records a value from inside this context.
    ///
    /// With `scoped` set and a scope active, the value lands both under
    /// the innermost scope and in the unscoped rollup; otherwise only the
    /// rollup is updated. This is the one-line entry point instrumentation
    /// hooks use for derived metrics that are not themselves scopes.
    pub fn record(
        &self,
        registry: &MetricsRegistry,
        name: &str,
        value: f64,
        scoped: bool,
    ) -> MetricsResult<()> {
        if scoped {
            if let Some(scope) = self.current_scope() {
                return registry.record_scoped(&scope, name, value);
            }
        }
        registry.record_unscoped(name, value)
    }

    /// The name of the innermost active scope, if any.
    pub fn current_scope(&self) -> Option<String> {
        self.frames.borrow().last().map(|s| s.name.clone())
    }

    /// Number of scopes currently active.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Whether the stack has returned to empty.
    ///
    /// A context that ends with a non-empty stack has an unclosed scope;
    /// [`TracedScope`] makes that structurally impossible for guarded
    /// blocks.
    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }
}

/// An error popping a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Pop was called on an empty stack.
    EmptyStack,
    /// The handle references no live scope (already popped, or from a
    /// different stack).
    StaleHandle,
    /// The handle's scope was buried under unclosed scopes; it and
    /// everything above it were discarded without recording.
    UnbalancedPop {
        /// The name of the scope the caller tried to pop.
        scope: String,
        /// How many unclosed scopes above it were discarded.
        discarded: usize,
    },
}

impl Display for ScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeError::EmptyStack => write!(f, "pop on an empty scope stack"),
            ScopeError::StaleHandle => write!(f, "scope handle references no live scope"),
            ScopeError::UnbalancedPop { scope, discarded } => write!(
                f,
                "unbalanced pop of scope '{scope}' ({discarded} unclosed scope(s) discarded)"
            ),
        }
    }
}

impl std::error::Error for ScopeError {}

/// A guard that times a scope and closes it on every exit path.
///
/// Pushes the scope on construction and pops it when dropped, so early
/// returns and panics cannot leak a scope and corrupt the exclusive-time
/// accounting of the rest of the context. Call [`TracedScope::finish`] to
/// close eagerly and observe the result; a drop that fails to close logs
/// instead.
pub struct TracedScope<'a> {
    stack: &'a ScopeStack,
    registry: &'a MetricsRegistry,
    metric_name: String,
    handle: Option<ScopeHandle>,
    stopwatch: Stopwatch,
}

impl<'a> TracedScope<'a> {
    /// Pushes `scope_name` onto `stack` and starts timing.
    ///
    /// The scope's timestamps run on the guard's own stopwatch, starting
    /// at zero; on close the elapsed time is recorded under `metric_name`.
    pub fn enter(
        stack: &'a ScopeStack,
        registry: &'a MetricsRegistry,
        scope_name: &str,
        metric_name: impl Into<String>,
    ) -> Self {
        let stopwatch = Stopwatch::new();
        let handle = stack.push(scope_name, 0.0);
        Self {
            stack,
            registry,
            metric_name: metric_name.into(),
            handle: Some(handle),
            stopwatch,
        }
    }

    /// Closes the scope now and reports how the pop went.
    pub fn finish(mut self) -> Result<(), ScopeError> {
        self.close()
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        match self.handle.take() {
            Some(handle) => {
                let end = self.stopwatch.elapsed_secs_f64().unwrap_or(0.0);
                self.stack.pop(self.registry, handle, &self.metric_name, end)
            }
            None => Ok(()),
        }
    }
}

impl Drop for TracedScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("[TracedScope] failed to close scope for '{}': {e}", self.metric_name);
        }
    }
}
