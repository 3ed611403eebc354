//! Leveled registry that fans log calls out to sinks
//!
//! The [`Registry`] owns a map from [`Level`] to an ordered [`SinkSet`],
//! a global threshold, the rotation snapshot, color and tag settings, and
//! an optional [`Hook`]. All of that mutable state sits behind a single
//! reader/writer lock:
//! - logging calls take the read lock just long enough to gate the call
//!   and clone the level's sink list, then write without holding it
//! - setters take the write lock, store the value and push it to every
//!   sink registered at that moment
//!
//! Sinks registered after a setter ran keep their own defaults until the
//! next broadcast or an explicit [`Registry::sync_sink_config`].


use crate::error::{DispatchError, SinkError};
use crate::hook::Hook;
use crate::hook_pool::{self, HookPool, HookPoolConfig, HookPoolStats};
use crate::level::Level;
use crate::record::{Payload, Tags};
use crate::sink::{RotationConfig, Sink, SinkSet};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

struct State {
    sinks: BTreeMap<Level, SinkSet>,
    level: Level,
    colored: bool,
    rotation: RotationConfig,
    tags: Arc<Tags>,
    hook: Option<Arc<dyn Hook>>,
    hook_level: Level,
    hook_async: bool,
    closed: bool,
}

impl State {
    fn for_each_sink(&self, mut f: impl FnMut(&dyn Sink)) {
        for set in self.sinks.values() {
            for sink in set.iter() {
                f(sink.as_ref());
            }
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            sinks: BTreeMap::new(),
            level: Level::Trace,
            colored: false,
            rotation: RotationConfig::default(),
            tags: Arc::new(Tags::new()),
            hook: None,
            hook_level: Level::Trace,
            hook_async: true,
            closed: false,
        }
    }
}

/// Result of gating one log call
struct Route {
    sinks: SinkSet,
    hook: Option<HookRoute>,
}

struct HookRoute {
    hook: Arc<dyn Hook>,
    run_async: bool,
}

/// Leveled logging dispatcher
pub struct Registry {
    state: Arc<RwLock<State>>,
    pool_config: HookPoolConfig,
    pool: OnceCell<HookPool>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Registry")
            .field("sinks", &state.sinks)
            .field("level", &state.level)
            .field("colored", &state.colored)
            .field("rotation", &state.rotation)
            .field("tags", &state.tags)
            .field("has_hook", &state.hook.is_some())
            .field("hook_level", &state.hook_level)
            .field("hook_async", &state.hook_async)
            .field("closed", &state.closed)
            .finish()
    }
}

impl Registry {
    /// Create an empty registry with the default hook pool sizing
    pub fn new() -> Self {
        Self::with_hook_pool(HookPoolConfig::default())
    }

    /// Create an empty registry whose asynchronous hooks run on a pool of
    /// the given size. Workers start on the first asynchronous hook call.
    pub fn with_hook_pool(pool_config: HookPoolConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            pool_config,
            pool: OnceCell::new(),
        }
    }

    // --- Sink registry ---

    /// Append `sink` to the sink set for `level`.
    ///
    /// No deduplication: registering the same sink twice makes it receive
    /// every call twice.
    pub fn register(&self, level: Level, sink: Arc<dyn Sink>) {
        let mut state = self.state.write();
        let set = state.sinks.entry(level).or_default();
        set.push(sink);
        tracing::debug!(%level, sinks = set.len(), "Registered sink");
    }

    /// Levels that have at least one sink, in severity order
    pub fn registered_levels(&self) -> Vec<Level> {
        self.state.read().sinks.keys().copied().collect()
    }

    /// Number of sinks registered for exactly `level`
    pub fn sink_count(&self, level: Level) -> usize {
        self.state.read().sinks.get(&level).map_or(0, SinkSet::len)
    }

    /// Push the current configuration snapshot to a single sink.
    ///
    /// Broadcasts only reach sinks registered at the time of the setter
    /// call; use this to catch up a sink registered later.
    pub fn sync_sink_config(&self, sink: &dyn Sink) {
        let state = self.state.read();
        sink.set_level(state.level);
        sink.set_colored(state.colored);
        sink.set_time_rotated(state.rotation.time_rotated);
        if state.rotation.retentions >= 1 {
            sink.set_retentions(state.rotation.retentions);
        }
        sink.set_rotate_size(state.rotation.rotate_size);
        sink.set_rotate_lines(state.rotation.rotate_lines);
        sink.set_tags(Arc::clone(&state.tags));
    }

    // --- Dispatch ---

    /// Gate a call: a sink set must exist for this exact level and the
    /// level must meet the threshold.
    fn route(&self, level: Level) -> Option<Route> {
        let state = self.state.read();
        let sinks = state.sinks.get(&level)?;
        if level < state.level {
            return None;
        }

        let hook = match &state.hook {
            Some(hook) if level >= state.hook_level => Some(HookRoute {
                hook: Arc::clone(hook),
                run_async: state.hook_async,
            }),
            _ => None,
        };

        Some(Route {
            sinks: sinks.clone(),
            hook,
        })
    }

    /// Log already-materialized values at `level`.
    ///
    /// Values are rendered with `Display` only once the call passed gating.
    /// Sinks are written in registration order; the first failing sink ends
    /// the fan-out and its error is returned. The hook is evaluated
    /// whether or not the writes succeeded.
    pub fn log<I>(&self, level: Level, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let Some(route) = self.route(level) else {
            return Ok(());
        };

        let values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        let written = route
            .sinks
            .iter()
            .try_for_each(|sink| sink.write(level, &values));

        let hooked = match route.hook {
            Some(hook) => self.fire_hook(level, hook, Payload::Values(values)),
            None => Ok(()),
        };

        written?;
        hooked
    }

    /// Log a formatted message at `level`; see [`Registry::log`]
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        let Some(route) = self.route(level) else {
            return Ok(());
        };

        let written = route
            .sinks
            .iter()
            .try_for_each(|sink| sink.write_formatted(level, args));

        let hooked = match route.hook {
            Some(hook) => self.fire_hook(level, hook, Payload::Formatted(args.to_string())),
            None => Ok(()),
        };

        written?;
        hooked
    }

    fn fire_hook(&self, level: Level, route: HookRoute, payload: Payload) -> Result<(), DispatchError> {
        if !route.run_async {
            // Inline hooks ignore the closed flag
            let tags = self.tags();
            return route.hook.fire(level, &tags, &payload).map_err(DispatchError::from);
        }

        let pool = {
            // Held so close() cannot slip in while the pool starts
            let state = self.state.read();
            if state.closed {
                return Ok(());
            }
            match self.pool.get_or_try_init(|| HookPool::new(self.pool_config)) {
                Ok(pool) => pool,
                Err(err) => {
                    tracing::error!(error = %err, "Hook pool unavailable, skipping hook");
                    return Ok(());
                }
            }
        };

        let state = Arc::clone(&self.state);
        let hook = route.hook;
        pool.submit(Box::new(move || {
            // Tags are read when the job runs, not when it was queued
            let tags = {
                let state = state.read();
                if state.closed {
                    return Ok(());
                }
                Arc::clone(&state.tags)
            };
            hook.fire(level, &tags, &payload)
        }));
        Ok(())
    }

    // --- Per-level entry points ---

    pub fn trace<I>(&self, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log(Level::Trace, values)
    }

    pub fn tracef(&self, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        self.logf(Level::Trace, args)
    }

    pub fn debug<I>(&self, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log(Level::Debug, values)
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        self.logf(Level::Debug, args)
    }

    pub fn info<I>(&self, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log(Level::Info, values)
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        self.logf(Level::Info, args)
    }

    pub fn warning<I>(&self, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log(Level::Warning, values)
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        self.logf(Level::Warning, args)
    }

    pub fn error<I>(&self, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log(Level::Error, values)
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        self.logf(Level::Error, args)
    }

    pub fn critical<I>(&self, values: I) -> Result<(), DispatchError>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log(Level::Critical, values)
    }

    pub fn criticalf(&self, args: fmt::Arguments<'_>) -> Result<(), DispatchError> {
        self.logf(Level::Critical, args)
    }

    // --- Configuration propagation ---

    /// Global threshold
    pub fn level(&self) -> Level {
        self.state.read().level
    }

    pub fn set_level(&self, level: Level) {
        let mut state = self.state.write();
        state.level = level;
        state.for_each_sink(|sink| sink.set_level(level));
        tracing::debug!(%level, "Broadcast threshold");
    }

    pub fn colored(&self) -> bool {
        self.state.read().colored
    }

    pub fn set_colored(&self, colored: bool) {
        let mut state = self.state.write();
        state.colored = colored;
        state.for_each_sink(|sink| sink.set_colored(colored));
    }

    pub fn time_rotated(&self) -> bool {
        self.state.read().rotation.time_rotated
    }

    /// Toggle time based rotation
    pub fn set_time_rotated(&self, time_rotated: bool) {
        let mut state = self.state.write();
        state.rotation.time_rotated = time_rotated;
        state.for_each_sink(|sink| sink.set_time_rotated(time_rotated));
    }

    /// How many rotated segments sinks keep
    pub fn retentions(&self) -> i64 {
        self.state.read().rotation.retentions
    }

    /// Values below 1 are ignored.
    pub fn set_retentions(&self, retentions: i64) {
        if retentions < 1 {
            return;
        }

        let mut state = self.state.write();
        state.rotation.retentions = retentions;
        state.for_each_sink(|sink| sink.set_retentions(retentions));
    }

    pub fn rotate_size(&self) -> u64 {
        self.state.read().rotation.rotate_size
    }

    /// Size in bytes at which sinks start a new segment
    pub fn set_rotate_size(&self, rotate_size: u64) {
        let mut state = self.state.write();
        state.rotation.rotate_size = rotate_size;
        state.for_each_sink(|sink| sink.set_rotate_size(rotate_size));
        tracing::debug!(rotate_size, "Broadcast rotate size");
    }

    pub fn rotate_lines(&self) -> u64 {
        self.state.read().rotation.rotate_lines
    }

    /// Line count at which sinks start a new segment
    pub fn set_rotate_lines(&self, rotate_lines: u64) {
        let mut state = self.state.write();
        state.rotation.rotate_lines = rotate_lines;
        state.for_each_sink(|sink| sink.set_rotate_lines(rotate_lines));
    }

    /// Current rotation snapshot
    pub fn rotation(&self) -> RotationConfig {
        self.state.read().rotation
    }

    /// Snapshot of the current tags; never a partially replaced map
    pub fn tags(&self) -> Arc<Tags> {
        Arc::clone(&self.state.read().tags)
    }

    /// Replace the tag map wholesale and push it to every sink
    pub fn set_tags(&self, tags: Tags) {
        let tags = Arc::new(tags);
        let mut state = self.state.write();
        state.tags = Arc::clone(&tags);
        state.for_each_sink(|sink| sink.set_tags(Arc::clone(&tags)));
    }

    // --- Hook settings ---

    pub fn has_hook(&self) -> bool {
        self.state.read().hook.is_some()
    }

    pub fn set_hook(&self, hook: Arc<dyn Hook>) {
        self.state.write().hook = Some(hook);
    }

    pub fn clear_hook(&self) {
        self.state.write().hook = None;
    }

    /// Minimum level at which the hook fires
    pub fn hook_level(&self) -> Level {
        self.state.read().hook_level
    }

    pub fn set_hook_level(&self, level: Level) {
        self.state.write().hook_level = level;
    }

    /// Whether the hook runs on the hook pool (default) or inline
    pub fn hook_async(&self) -> bool {
        self.state.read().hook_async
    }

    pub fn set_hook_async(&self, hook_async: bool) {
        self.state.write().hook_async = hook_async;
    }

    /// Hook pool counters, `None` until the first asynchronous hook call
    pub fn hook_stats(&self) -> Option<HookPoolStats> {
        self.pool.get().map(HookPool::stats)
    }

    // --- Lifecycle ---

    /// Flush every sink. All sinks are attempted; the first error wins.
    pub fn flush(&self) -> Result<(), SinkError> {
        let sets: Vec<SinkSet> = self.state.read().sinks.values().cloned().collect();

        let mut first_err = None;
        for sink in sets.iter().flat_map(SinkSet::iter) {
            if let Err(err) = sink.flush() {
                tracing::warn!(error = %err, "Sink flush failed");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Close every sink and mark the registry closed.
    ///
    /// Waits for asynchronous hooks that are already running, then closes
    /// the sinks. Queued hooks that have not started become no-ops and the
    /// hook workers are stopped. Sink dispatch is not blocked afterwards.
    /// A second call does nothing.
    ///
    /// Called from inside an asynchronous hook, it does not wait for the
    /// running hooks.
    pub fn close(&self) -> Result<(), SinkError> {
        let on_worker = hook_pool::on_worker_thread();
        let paused = self.pool.get().filter(|_| !on_worker).map(HookPool::pause);

        let result = {
            let mut state = self.state.write();
            if state.closed {
                return Ok(());
            }

            let mut first_err = None;
            state.for_each_sink(|sink| {
                if let Err(err) = sink.close() {
                    tracing::warn!(error = %err, "Sink close failed");
                    first_err.get_or_insert(err);
                }
            });
            state.closed = true;
            tracing::debug!("Registry closed");

            first_err.map_or(Ok(()), Err)
        };

        // Workers finish the queue as no-ops, which needs the gate released
        drop(paused);
        if let Some(pool) = self.pool.get() {
            pool.shutdown();
        }
        result
    }
}
