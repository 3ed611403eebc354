//! Sink capability set and the per-level sink list

use crate::error::SinkError;
use crate::level::Level;
use crate::record::Tags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A destination for leveled log messages.
///
/// The registry only ever talks to sinks through this trait and never
/// inspects the concrete transport. Configuration setters default to
/// no-ops so transports without rotation or color support can skip them.
pub trait Sink: Send + Sync {
    /// Write already-rendered values
    fn write(&self, level: Level, values: &[String]) -> Result<(), SinkError>;

    /// Write a formatted message
    fn write_formatted(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError>;

    fn close(&self) -> Result<(), SinkError>;

    fn set_level(&self, _level: Level) {}

    fn set_colored(&self, _colored: bool) {}

    fn set_time_rotated(&self, _time_rotated: bool) {}

    fn set_retentions(&self, _retentions: i64) {}

    fn set_rotate_size(&self, _rotate_size: u64) {}

    fn set_rotate_lines(&self, _rotate_lines: u64) {}

    fn set_tags(&self, _tags: Arc<Tags>) {}
}

/// Ordered sinks attached to one level; insertion order is dispatch order
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Arc<Vec<Arc<dyn Sink>>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sink, copying the list only if a dispatch still holds it
    pub fn push(&mut self, sink: Arc<dyn Sink>) {
        Arc::make_mut(&mut self.sinks).push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Sink>> {
        self.sinks.iter()
    }
}

impl fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSet").field("len", &self.len()).finish()
    }
}

/// Rotation parameters propagated to every sink.
///
/// The registry stores and broadcasts these; enforcing them on disk is up
/// to each sink. Zero means "disabled" for size and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RotationConfig {
    pub time_rotated: bool,
    pub retentions: i64,
    pub rotate_size: u64,
    pub rotate_lines: u64,
}
