//! Payload and record types passed to sinks and hooks

use crate::level::Level;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

/// Key-value annotations attached to every log call until replaced
pub type Tags = HashMap<String, String>;

/// What a log call carried, rendered to owned strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    /// Values from a plain entry point, in call order
    Values(Vec<String>),
    /// Message rendered from a formatted entry point
    Formatted(String),
}

impl Payload {
    /// Render each value with `Display`
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        Payload::Values(values.into_iter().map(|v| v.to_string()).collect())
    }

    /// Message text, with plain values joined by a single space
    pub fn message(&self) -> String {
        match self {
            Payload::Values(values) => values.join(" "),
            Payload::Formatted(message) => message.clone(),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Values(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(value)?;
                }
                Ok(())
            }
            Payload::Formatted(message) => f.write_str(message),
        }
    }
}

/// Complete log line as the bundled sinks render it
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord<'a> {
    /// Milliseconds since the unix epoch
    pub timestamp_ms: u128,
    pub level: Level,
    pub message: &'a str,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a Tags,
}

fn no_tags(tags: &&Tags) -> bool {
    tags.is_empty()
}

impl<'a> LogRecord<'a> {
    /// Create a record stamped with the current time
    pub fn new(level: Level, message: &'a str, tags: &'a Tags) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        Self {
            timestamp_ms,
            level,
            message,
            tags,
        }
    }

    /// Format the record as a single text line (without newline)
    pub fn format_text(&self, colored: bool) -> String {
        let secs = self.timestamp_ms / 1000;
        let millis = self.timestamp_ms % 1000;

        let tags = if self.tags.is_empty() {
            String::new()
        } else {
            // Sorted so identical maps render identically
            let mut pairs: Vec<_> = self.tags.iter().collect();
            pairs.sort();
            let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!(" [{}]", joined.join(", "))
        };

        if colored {
            format!(
                "[{}.{:03}] {}{}\x1b[0m{} {}",
                secs,
                millis,
                self.level.color(),
                self.level,
                tags,
                self.message
            )
        } else {
            format!("[{}.{:03}] {}{} {}", secs, millis, self.level, tags, self.message)
        }
    }

    /// Format the record as one JSON object
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
