//! KNCR Core
//!
//! Core types shared by the KNCR build orchestrator.
//!
//! This crate contains:
//! - Domain types: repositories, the build-system command catalog, pipeline
//!   states and the host platform model
//! - Bundled resources: the default repository list and command catalog
//! - Error types for configuration loading

pub mod domain;
pub mod error;
pub mod resources;

pub use domain::catalog::{CUSTOM_TYPE, CommandCatalog, CommandTemplate, SharedCatalog};
pub use domain::pipeline::{PipelineReport, PipelineState, Step, Task};
pub use domain::platform::{Arch, Os, Platform};
pub use domain::repository::{
    BUILD_CMDS_KEY, CloneSource, Repository, load_repositories, parse_repositories,
};
pub use error::{CatalogError, PlatformError, RepositoryError};
