//! Core domain types
//!
//! These types describe what the orchestrator builds (repositories), how it
//! builds them (the command catalog), where it runs (the host platform) and
//! how far each repository got (pipeline states).

pub mod catalog;
pub mod pipeline;
pub mod platform;
pub mod repository;
