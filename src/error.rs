//! Error types for the engine.
//!
//! Fallible setup paths (configuration parsing, asset resolution, backend
//! resource creation) return [`EngineError`]. The per-frame paths never fail:
//! they log and skip instead.

use thiserror::Error;

/// Main error type for the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A JSON configuration blob could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    /// A named asset was not present in the registry.
    #[error("Unknown {kind}: {name}")]
    UnknownAsset { kind: &'static str, name: String },
    /// The render backend could not create a resource.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl EngineError {
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownAsset {
            kind,
            name: name.into(),
        }
    }
}

/// Convenient Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
