//! Error handling for lightflow
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library. Configuration problems are raised at setup time,
//! interpolation problems at the point a transition is computed.

use crate::pipeline::id::NodeId;
use thiserror::Error;

/// Main error type for lightflow operations
#[derive(Error, Debug)]
pub enum LightError {
    /// Invalid setup: bad dim order, unknown device, empty sequence, bad settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two parameter sets cannot be blended (missing color information)
    #[error("Interpolation error: {0}")]
    Interpolation(String),

    /// A node or scope failed to release its resources
    #[error("Dispose error in node {node}: {message}")]
    Dispose { node: NodeId, message: String },

    /// A node factory refused to build a node
    #[error("Node factory error: {0}")]
    Factory(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LightError>,
    },
}

impl LightError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LightError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a configuration error
    pub fn is_config(&self) -> bool {
        match self {
            LightError::Config(_) => true,
            LightError::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }
}

/// Result type alias for lightflow operations
pub type Result<T> = std::result::Result<T, LightError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
