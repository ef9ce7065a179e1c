//! Error types for the presence simulator

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while loading or running a scenario
#[derive(Debug, Error)]
pub enum SimError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] presence_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid TOML or has unknown actions
    #[error("Scenario parse error: {0}")]
    ScenarioParse(#[from] toml::de::Error),

    /// A step carries values the device cannot produce
    #[error("Invalid step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    /// The step producer stopped before the queue drained
    #[error("Step producer failed: {0}")]
    Producer(#[from] tokio::task::JoinError),
}
