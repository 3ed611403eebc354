//! Out-of-band observability hook

use crate::error::HookError;
use crate::level::Level;
use crate::record::{Payload, Tags};

/// Callback fired for log calls at or above the hook level.
///
/// Hooks run independently of sink writes, either inline on the caller's
/// thread or on the registry's hook workers.
pub trait Hook: Send + Sync {
    fn fire(&self, level: Level, tags: &Tags, payload: &Payload) -> Result<(), HookError>;
}

/// Adapts a closure into a [`Hook`]
pub struct FnHook<F>(pub F);

impl<F> Hook for FnHook<F>
where
    F: Fn(Level, &Tags, &Payload) -> Result<(), HookError> + Send + Sync,
{
    fn fire(&self, level: Level, tags: &Tags, payload: &Payload) -> Result<(), HookError> {
        (self.0)(level, tags, payload)
    }
}

/// Hook that re-emits every fired log call as a `tracing` event
#[derive(Debug, Default)]
pub struct TracingHook;

impl TracingHook {
    pub fn new() -> Self {
        Self
    }
}

impl Hook for TracingHook {
    fn fire(&self, level: Level, tags: &Tags, payload: &Payload) -> Result<(), HookError> {
        let message = payload.message();
        match level {
            Level::Trace => tracing::trace!(target: "fanlog::hook", ?tags, "{}", message),
            Level::Debug => tracing::debug!(target: "fanlog::hook", ?tags, "{}", message),
            Level::Info => tracing::info!(target: "fanlog::hook", ?tags, "{}", message),
            Level::Warning => tracing::warn!(target: "fanlog::hook", ?tags, "{}", message),
            Level::Error | Level::Critical => {
                tracing::error!(target: "fanlog::hook", %level, ?tags, "{}", message)
            }
        }
        Ok(())
    }
}
