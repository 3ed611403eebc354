//! Append-only buffered file sink

use super::{OutputFormat, SinkSettings};
use crate::error::SinkError;
use crate::level::Level;
use crate::record::Tags;
use crate::sink::Sink;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appends one line per log call to a file.
///
/// Rotation parameters pushed by the registry are recorded in
/// [`SinkSettings`] but segments are never rotated by this sink.
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
    writer: Mutex<Option<BufWriter<File>>>,
    settings: Mutex<SinkSettings>,
}

impl FileSink {
    /// Open `path` for appending, creating it if missing
    pub fn open(path: impl AsRef<Path>, format: OutputFormat) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            format,
            writer: Mutex::new(Some(BufWriter::new(file))),
            settings: Mutex::new(SinkSettings::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
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

        let mut writer = self.writer.lock();
        let writer = writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl Sink for FileSink {
    fn write(&self, level: Level, values: &[String]) -> Result<(), SinkError> {
        self.emit(level, &values.join(" "))
    }

    fn write_formatted(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), SinkError> {
        self.emit(level, &args.to_string())
    }

    fn flush(&self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.lock().as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        match self.writer.lock().take() {
            Some(mut writer) => {
                writer.flush()?;
                Ok(())
            }
            None => Ok(()),
        }
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
