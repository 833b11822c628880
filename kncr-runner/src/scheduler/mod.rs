//! Scheduler layer
//!
//! Fans out one pipeline task per repository under a single parent task,
//! bounds how many run at once and reports how many are still in flight.

pub mod monitor;
pub mod orchestrator;

pub use monitor::{InFlight, InFlightGuard};
pub use orchestrator::{Orchestrator, RunSummary};
