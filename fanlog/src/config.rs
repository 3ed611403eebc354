//! TOML configuration that builds a ready-to-use [`Registry`]

use crate::error::ConfigError;
use crate::hook::TracingHook;
use crate::hook_pool::{HookPoolConfig, OverflowPolicy};
use crate::level::Level;
use crate::record::Tags;
use crate::registry::Registry;
use crate::sink::Sink;
use crate::sinks::{ConsoleSink, FileSink, OutputFormat, SocketSink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Top-level logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Global threshold
    pub level: String,
    pub colored: bool,
    pub rotation: RotationSection,
    pub tags: Tags,
    /// Hook settings; no hook is installed when absent
    pub hook: Option<HookSection>,
    pub sinks: Vec<SinkSection>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "trace".to_string(),
            colored: false,
            rotation: RotationSection::default(),
            tags: Tags::new(),
            hook: None,
            sinks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSection {
    /// One of `none`, `size`, `lines` or `time`
    #[serde(rename = "type")]
    pub rotate_type: String,
    pub size: u64,
    pub lines: u64,
    pub retentions: i64,
}

impl Default for RotationSection {
    fn default() -> Self {
        Self {
            rotate_type: "none".to_string(),
            size: 0,
            lines: 0,
            retentions: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSection {
    /// Minimum level that fires the hook
    pub level: String,
    #[serde(rename = "async")]
    pub run_async: bool,
    pub workers: usize,
    pub queue_capacity: usize,
    /// One of `drop_newest`, `drop_oldest` or `block`
    pub overflow: String,
    pub block_timeout_ms: u64,
}

impl Default for HookSection {
    fn default() -> Self {
        let pool = HookPoolConfig::default();
        Self {
            level: "warning".to_string(),
            run_async: true,
            workers: pool.workers,
            queue_capacity: pool.queue_capacity,
            overflow: "drop_newest".to_string(),
            block_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    /// `console`, `file` or `socket`
    pub kind: String,
    /// Levels this sink is registered for; empty means every level
    pub levels: Vec<String>,
    /// Required for `file` sinks
    pub path: Option<PathBuf>,
    /// `host:port` of the UDP peer; required for `socket` sinks
    pub address: Option<String>,
    /// `stdout` or `stderr` for console sinks
    pub stream: String,
    pub format: OutputFormat,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            kind: "console".to_string(),
            levels: Vec::new(),
            path: None,
            address: None,
            stream: "stderr".to_string(),
            format: OutputFormat::Text,
        }
    }
}

/// Rotation strategy named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateType {
    None,
    Size,
    Lines,
    Time,
}

impl std::str::FromStr for RotateType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(RotateType::None),
            "size" => Ok(RotateType::Size),
            "lines" | "line" => Ok(RotateType::Lines),
            "time" | "daily" => Ok(RotateType::Time),
            _ => Err(ConfigError::InvalidRotateType(s.to_string())),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration and build a registry.
    ///
    /// All sinks are registered before any setting is broadcast, so every
    /// configured sink receives the full configuration.
    pub fn build(&self) -> Result<Registry, ConfigError> {
        let threshold: Level = self.level.parse()?;
        let rotate_type: RotateType = self.rotation.rotate_type.parse()?;

        let pool_config = match &self.hook {
            Some(hook) => hook.pool_config()?,
            None => HookPoolConfig::default(),
        };
        let registry = Registry::with_hook_pool(pool_config);

        for section in &self.sinks {
            let sink = section.open()?;
            for level in section.levels()? {
                registry.register(level, Arc::clone(&sink));
            }
        }

        registry.set_level(threshold);
        registry.set_colored(self.colored);
        match rotate_type {
            RotateType::None => {}
            RotateType::Size => registry.set_rotate_size(self.rotation.size),
            RotateType::Lines => registry.set_rotate_lines(self.rotation.lines),
            RotateType::Time => registry.set_time_rotated(true),
        }
        registry.set_retentions(self.rotation.retentions);
        registry.set_tags(self.tags.clone());

        if let Some(hook) = &self.hook {
            registry.set_hook_level(hook.level.parse()?);
            registry.set_hook_async(hook.run_async);
            registry.set_hook(Arc::new(TracingHook::new()));
        }

        tracing::debug!(
            sinks = self.sinks.len(),
            level = %threshold,
            rotate = ?rotate_type,
            "Built registry from configuration"
        );
        Ok(registry)
    }
}

impl HookSection {
    fn pool_config(&self) -> Result<HookPoolConfig, ConfigError> {
        let overflow = match self.overflow.trim().to_ascii_lowercase().as_str() {
            "drop_newest" => OverflowPolicy::DropNewest,
            "drop_oldest" => OverflowPolicy::DropOldest,
            "block" => OverflowPolicy::Block {
                timeout: Duration::from_millis(self.block_timeout_ms),
            },
            other => return Err(ConfigError::InvalidOverflowPolicy(other.to_string())),
        };

        Ok(HookPoolConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            overflow,
        })
    }
}

impl SinkSection {
    fn levels(&self) -> Result<Vec<Level>, ConfigError> {
        if self.levels.is_empty() {
            return Ok(Level::ALL.to_vec());
        }
        self.levels.iter().map(|level| level.parse()).collect()
    }

    fn open(&self) -> Result<Arc<dyn Sink>, ConfigError> {
        match self.kind.trim().to_ascii_lowercase().as_str() {
            "console" => {
                let sink = match self.stream.trim().to_ascii_lowercase().as_str() {
                    "stdout" => ConsoleSink::stdout(self.format),
                    _ => ConsoleSink::stderr(self.format),
                };
                Ok(Arc::new(sink))
            }
            "file" => {
                let path = self.path.as_ref().ok_or(ConfigError::FilePathNotFound)?;
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::FilePathNotFound);
                }
                Ok(Arc::new(FileSink::open(path, self.format)?))
            }
            "socket" => {
                let address = self
                    .address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or(ConfigError::SocketAddressNotFound)?;
                Ok(Arc::new(SocketSink::connect(address, self.format)?))
            }
            other => Err(ConfigError::InvalidSinkKind(other.to_string())),
        }
    }
}
