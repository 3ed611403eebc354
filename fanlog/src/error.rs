//! Error types for configuration, sinks, hooks and dispatch

use std::io;
use thiserror::Error;

/// Errors raised while building a registry from configuration.
///
/// These gate construction only; logging calls never produce them.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File Path must be defined")]
    FilePathNotFound,
    #[error("Socket address must be defined")]
    SocketAddressNotFound,
    #[error("Invalid level string: {0}")]
    InvalidLevel(String),
    #[error("Invalid log rotate type: {0}")]
    InvalidRotateType(String),
    #[error("Invalid hook overflow policy: {0}")]
    InvalidOverflowPolicy(String),
    #[error("Invalid sink kind: {0}")]
    InvalidSinkKind(String),
    #[error("Global registry already initialized")]
    AlreadyInitialized,
    #[error("Configuration I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors returned by a [`Sink`](crate::Sink) operation
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("sink is closed")]
    Closed,
    #[error("sink error: {0}")]
    Other(String),
}

/// Errors returned by a [`Hook`](crate::Hook)
#[derive(Error, Debug)]
pub enum HookError {
    #[error("hook failed: {0}")]
    Failed(String),
}

/// Errors surfaced to the caller of a logging entry point.
///
/// Only a failing sink write or a failing synchronous hook produce one;
/// gating misses are silent.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Hook(#[from] HookError),
}
