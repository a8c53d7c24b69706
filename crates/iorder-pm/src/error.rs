use thiserror::Error;

use crate::resolvable::ResolvableId;

#[derive(Error, Debug)]
pub enum IorderError {
    // Analyzer invariants
    #[error("Analysis stack corrupted: expected {expected} on top of {stack:?}")]
    StackCorrupted {
        expected: ResolvableId,
        stack: Vec<ResolvableId>,
    },

    // Pool errors
    #[error("Unknown resolvable: {0}")]
    UnknownResolvable(ResolvableId),

    #[error("Invalid capability: {0}")]
    InvalidCapability(String),

    // Test case errors
    #[error("Invalid test case: {0}")]
    TestCase(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IorderError {
    /// Internal invariant violations, as opposed to problems with the input data.
    pub fn is_internal(&self) -> bool {
        matches!(self, IorderError::StackCorrupted { .. })
    }
}

pub type Result<T> = std::result::Result<T, IorderError>;
