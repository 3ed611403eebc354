//! Reference sink transports
//!
//! Every sink keeps the configuration pushed by the registry in a
//! [`SinkSettings`] value and drop writes below their own threshold.
//! Rotation parameters are stored for inspection only.

pub mod console;
pub mod file;
pub mod socket;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use socket::SocketSink;

use crate::error::SinkError;
use crate::level::Level;
use crate::record::{LogRecord, Tags};
use crate::sink::RotationConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Line format used by the bundled sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Configuration a sink has received from the registry
#[derive(Debug, Clone, Default)]
pub struct SinkSettings {
    pub level: Level,
    pub colored: bool,
    pub rotation: RotationConfig,
    pub tags: Arc<Tags>,
}

impl SinkSettings {
    pub(crate) fn accepts(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Render one line, newline included
    pub(crate) fn render(&self, format: OutputFormat, level: Level, message: &str) -> Result<String, SinkError> {
        let record = LogRecord::new(level, message, &self.tags);
        let mut line = match format {
            OutputFormat::Text => record.format_text(self.colored),
            OutputFormat::Json => record
                .format_json()
                .map_err(|e| SinkError::Other(e.to_string()))?,
        };
        line.push('\n');
        Ok(line)
    }
}
