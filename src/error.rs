//! Error types for Stagehand operations.
//!
//! This module defines [`StagehandError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Authoring mistakes (bad casts, runaway templates, bad host strings) fail loudly
//! - Parameter parsing problems are reported with the task's help text
//! - Failed remote or local commands are *not* errors: they are captured in
//!   [`CommandOutput`](crate::runner::CommandOutput) and the task body decides
//! - Use `anyhow::Error` (via `StagehandError::Other`) for everything else

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Task parameters could not be parsed from the command line.
    #[error("Invalid parameters for '{task}': {message}")]
    InvalidParameters { task: String, message: String },

    /// A `{{ placeholder }}` chain kept expanding past the recursion cap.
    #[error("Template expansion exceeded depth {depth} while resolving '{template}'")]
    TemplateDepthExceeded { template: String, depth: usize },

    /// A configuration value was read as the wrong type.
    #[error("Config value '{name}' is {found}, not {expected}")]
    InvalidCast {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A host descriptor could not be parsed.
    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// A connection was opened twice for the same target.
    #[error("Target '{target}' is already connected")]
    AlreadyConnected { target: String },

    /// A connection was used or closed after it was closed.
    #[error("Connection to '{target}' is closed")]
    ConnectionClosed { target: String },

    /// The transport could not reach a target.
    #[error("Target '{target}' is unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    /// A target-scoped helper was called with no current target.
    #[error("'{operation}' needs an active target")]
    NoActiveTarget { operation: String },

    /// A task body gave up.
    #[error("Task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    /// Stagefile not found at the expected location.
    #[error("Stagefile not found: {path}")]
    StagefileNotFound { path: PathBuf },

    /// Stagefile could not be parsed.
    #[error("Failed to parse stagefile at {path}: {message}")]
    StagefileParse { path: PathBuf, message: String },

    /// Stagefile parsed but declares something unusable.
    #[error("Invalid stagefile: {message}")]
    StagefileInvalid { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;
