//! Error types for interpolation runs.
//!
//! Configuration problems surface before generation starts; model and I/O
//! errors abort the run at the artifact being produced.

use std::path::PathBuf;

use thiserror::Error;
use vaultgen_core::ModelError;

/// Errors that can occur while configuring or executing a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O failure without a path (e.g. writing to the output stream).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// I/O failure on a specific file or directory.
    #[error("I/O error at {}: {source}", path.display())]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid run configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Schema model failure raised by a generator module.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EngineError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for results with [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_mentions_path() {
        let err = EngineError::file(
            "/tmp/out/001_x.auto.sql",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error at /tmp/out/001_x.auto.sql: denied");
    }

    #[test]
    fn test_model_error_is_transparent() {
        let err: EngineError = ModelError::EmptyLink("link_x".into()).into();
        assert_eq!(err.to_string(), ModelError::EmptyLink("link_x".into()).to_string());
    }
}
