//! Error types for loading and validating configuration

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the build-system command catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Command catalog not found at {}: {source}", .path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog could not be parsed or contains an invalid entry
    #[error("Malformed command catalog: {0}")]
    Malformed(String),

    /// A repository asked for a build system the catalog does not know
    #[error("Unknown build system type: {0}")]
    UnknownType(String),
}

/// Errors raised while loading or validating repositories
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The repository list could not be read
    #[error("Repository list not found at {}: {source}", .path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The repository list could not be parsed
    #[error("Malformed repository list: {0}")]
    Malformed(String),

    /// A field that ends up in a filesystem path is not safe to use
    #[error("Repository '{handle}' has an unsafe {field}: '{value}'")]
    UnsafePath {
        handle: String,
        field: &'static str,
        value: String,
    },

    /// Two repositories share a handle
    #[error("Duplicate repository handle: {0}")]
    DuplicateHandle(String),

    /// A custom repository has no `build-cmds` entry
    #[error("No build commands provided for custom build system in '{0}'")]
    MissingBuildCommands(String),
}

/// Errors raised while detecting the host platform
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),
}
