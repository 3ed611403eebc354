//! Leveled logging dispatcher for fanlog
//!
//! A [`Registry`] routes each log call to the sinks registered for that
//! exact level, pushes rotation and tag settings to those sinks, and fires
//! an optional observability [`Hook`] on a bounded worker pool.

mod macros;

pub mod config;
pub mod error;
pub mod hook;
pub mod hook_pool;
pub mod level;
pub mod record;
pub mod registry;
pub mod sink;
pub mod sinks;

pub use config::LoggerConfig;
pub use error::{ConfigError, DispatchError, HookError, SinkError};
pub use hook::{FnHook, Hook, TracingHook};
pub use hook_pool::{HookPoolConfig, HookPoolStats, OverflowPolicy};
pub use level::Level;
pub use record::{LogRecord, Payload, Tags};
pub use registry::Registry;
pub use sink::{RotationConfig, Sink, SinkSet};
pub use sinks::{ConsoleSink, FileSink, OutputFormat, SinkSettings, SocketSink};

use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Global registry instance
static GLOBAL: OnceCell<Arc<Registry>> = OnceCell::new();

/// Install the process-wide registry
pub fn init_global(registry: Registry) -> Result<Arc<Registry>, ConfigError> {
    let registry = Arc::new(registry);
    GLOBAL
        .set(Arc::clone(&registry))
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    Ok(registry)
}

/// Get the process-wide registry, if one was installed
pub fn global() -> Option<Arc<Registry>> {
    GLOBAL.get().cloned()
}
