//! Error types for the runner

use kncr_core::{CatalogError, RepositoryError};
use std::path::PathBuf;
use thiserror::Error;

/// An external command exited non-zero or could not be started
#[derive(Debug, Error)]
#[error("Failed to run command '{command}' in {}; exit code {exit_code}: {body}", .dir.display())]
pub struct RunnerError {
    /// Command line as given to the runner
    pub command: String,
    /// Working directory of the process
    pub dir: PathBuf,
    /// Process exit code, -1 when the process never ran or was killed by a signal
    pub exit_code: i32,
    /// Captured output, or the reason the process could not be started
    pub body: String,
}

impl RunnerError {
    pub fn new(
        command: impl Into<String>,
        dir: impl Into<PathBuf>,
        exit_code: i32,
        body: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            dir: dir.into(),
            exit_code,
            body: body.into(),
        }
    }
}

/// Failure of one repository's pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A build, interop or publish command failed
    #[error(transparent)]
    Process(#[from] RunnerError),

    /// The repository's build-system type is not in the catalog
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The repository is misconfigured
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// An artifact could not be written or removed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors caused by the repository declaration itself
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Catalog(_) | Self::Repository(_))
    }
}

/// Invalid run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Unknown repository handle: {0}")]
    UnknownHandle(String),
}
