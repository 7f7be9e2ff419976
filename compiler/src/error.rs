//! Error type for schema document loading and compilation.

use thiserror::Error;

/// Errors that can occur while loading or compiling a schema document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Schema compilation failure.
    #[error(transparent)]
    Config(#[from] fieldtree_core::ConfigError),
}

/// Convenience alias for results with [`DocumentError`].
pub type Result<T> = std::result::Result<T, DocumentError>;
