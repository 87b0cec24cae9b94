//! Error taxonomy shared across the engine.
//!
//! Each analytical operation and each persistence call returns
//! `Result<T, EngineError>`; the CLI layer maps `EngineError` variants onto
//! process exit codes and downcasts `anyhow::Error` back into this type at
//! the reporting boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no graph found at {0}; run `codekg scan` first")]
    NotInitialized(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("git is unavailable or {0} is not a git repository")]
    GitUnavailable(PathBuf),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl EngineError {
    /// Tiered process exit code, consumed by the CLI's final mapping step.
    ///
    /// 0 = success (not constructed here), 1 = not-found/empty-result,
    /// 2 = user/input error, 3 = internal/environment error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => 1,
            Self::InvalidInput(_) | Self::NotInitialized(_) => 2,
            Self::Io { .. }
            | Self::Parse { .. }
            | Self::GitUnavailable(_)
            | Self::Timeout(_)
            | Self::InternalInvariantViolation(_) => 3,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
