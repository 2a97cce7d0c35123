//! Error types for the logger system
//!
//! None of these errors reach the code calling `Logger::log`. They surface
//! through fallible setup calls (`Broker::try_sink_to`, `BrokerBuilder::try_build`,
//! `Destination::file`) and through the broker's diagnostic callback.

use std::sync::Arc;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Callback invoked on a sink worker thread for non-fatal pipeline failures
pub type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// The worker thread for a new sink could not be started
    #[error("Failed to spawn worker for sink: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// A formatter or destination panicked while handling a record
    #[error("Sink {sink} panicked: {message}")]
    SinkPanicked { sink: String, message: String },
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn sink_panicked(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkPanicked {
            sink: sink.into(),
            message: message.into(),
        }
    }
}
