//! Console sink writing to stdout, stderr or any `Write`

use super::{OutputFormat, SinkSettings};
use crate::error::SinkError;
use crate::level::Level;
use crate::record::Tags;
use crate::sink::Sink;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Writes one line per log call to a terminal stream
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    format: OutputFormat,
    settings: Mutex<SinkSettings>,
}

impl ConsoleSink {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::with_writer(Box::new(io::stdout()), format)
    }

    pub fn stderr(format: OutputFormat) -> Self {
        Self::with_writer(Box::new(io::stderr()), format)
    }

    /// Write to an arbitrary destination
    pub fn with_writer(out: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            out: Mutex::new(out),
            format,
            settings: Mutex::new(SinkSettings::default()),
        }
    }

    pub fn settings(&self) -> SinkSettings {
        self.settings.lock().clone()
    }

    fn emit(&self, level: Level, message: &str) -> Result<(), SinkError> {
        let line = {
            let settings = self.settings.lock();
            if !settings.accepts(level) {
                return Ok(());
            }
            settings.render(self.format, level, message)?
        };
        self.out.lock().write_all(line.as_bytes())?;
        Ok(())
    }
}

impl Sink for ConsoleSink {
    fn write(&self, level: Level, values: &[String]) -> Result<(), SinkError> {
        self.emit(level, &values.join(" "))
    }

    fn write_formatted(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), SinkError> {
        self.emit(level, &args.to_string())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.out.lock().flush()?;
        Ok(())
    }

    /// Terminal streams stay open; closing only flushes
    fn close(&self) -> Result<(), SinkError> {
        self.flush()
    }

    fn set_level(&self, level: Level) {
        self.settings.lock().level = level;
    }

    fn set_colored(&self, colored: bool) {
        self.settings.lock().colored = colored;
    }

    fn set_time_rotated(&self, time_rotated: bool) {
        self.settings.lock().rotation.time_rotated = time_rotated;
    }

    fn set_retentions(&self, retentions: i64) {
        self.settings.lock().rotation.retentions = retentions;
    }

    fn set_rotate_size(&self, rotate_size: u64) {
        self.settings.lock().rotation.rotate_size = rotate_size;
    }

    fn set_rotate_lines(&self, rotate_lines: u64) {
        self.settings.lock().rotation.rotate_lines = rotate_lines;
    }

    fn set_tags(&self, tags: Arc<Tags>) {
        self.settings.lock().tags = tags;
    }
}
