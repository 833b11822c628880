//! Service layer
//!
//! Services contain the business logic of a run: resolving build commands,
//! checking out sources and driving a repository through its pipeline.
//!
//! The pipeline is trait-based so the scheduler can be tested without
//! running real builds.

mod build;
mod pipeline;
mod source;

// Re-export traits
pub use pipeline::PipelineService;

// Re-export implementations
pub use build::resolve_build_commands;
pub use pipeline::{PipelineSettings, StandardPipelineService};
pub use source::clone_command;
