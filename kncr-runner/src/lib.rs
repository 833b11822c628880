//! KNCR Runner
//!
//! Builds Kotlin/Native cinterop klibs for a list of C/C++ repositories and
//! publishes them to Maven.
//!
//! Architecture:
//! - Configuration: run settings from the command line and environment
//! - Process: subprocess execution with heartbeat and error classification
//! - Services: build command resolution, checkout and the repository pipeline
//! - Scheduler: concurrent fan-out of pipelines under a parallelism cap
//!
//! Each repository's pipeline is idempotent: artifacts already on disk are
//! reused, so an interrupted run can simply be started again.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod process;
pub mod scheduler;
pub mod service;
pub mod toolchain;

#[cfg(test)]
mod testing;

pub use config::{Config, FailurePolicy, MavenTarget, PublishCoordinates};
pub use error::{ConfigError, PipelineError, RunnerError};
pub use process::{CommandExecutor, OutputMode, ProcessRunner};
pub use scheduler::{Orchestrator, RunSummary};
pub use service::{PipelineService, PipelineSettings, StandardPipelineService};
pub use toolchain::Toolchain;
