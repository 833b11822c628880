//! Pipeline domain types
//!
//! States a repository moves through while it is cloned, built, compiled to
//! a klib and published, plus the report produced when its pipeline ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the run does with a produced klib
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Only check that every repository builds; artifacts are discarded
    Build,
    /// Install artifacts into the local Maven repository
    Install,
    /// Deploy artifacts to the remote Maven repository
    Deploy,
}

impl Task {
    /// Returns true if this task publishes the artifact
    pub fn publishes(&self) -> bool {
        !matches!(self, Task::Build)
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "build" => Ok(Task::Build),
            "install" => Ok(Task::Install),
            "deploy" => Ok(Task::Deploy),
            other => Err(format!(
                "unknown task '{}', expected one of: build, install, deploy",
                other
            )),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Build => write!(f, "build"),
            Task::Install => write!(f, "install"),
            Task::Deploy => write!(f, "deploy"),
        }
    }
}

/// Progress of one repository's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Pending,
    Cloned,
    Built,
    DefinitionWritten,
    InteropCompiled,
    /// Build-only run finished and discarded its artifact
    BuildOnlyDone,
    PackagePrepared,
    Published,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Skipped steps are allowed to jump forward; a pipeline never moves
    /// backwards and nothing leaves a terminal state.
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }

        match next {
            Failed => true,
            Pending => false,
            BuildOnlyDone => matches!(self, Cloned | InteropCompiled),
            PackagePrepared => matches!(self, Cloned | InteropCompiled),
            Published => *self == PackagePrepared,
            Done => matches!(self, BuildOnlyDone | Published),
            _ => next.ordinal() > self.ordinal() && next.ordinal() <= InteropCompiled.ordinal(),
        }
    }

    fn ordinal(&self) -> u8 {
        use PipelineState::*;

        match self {
            Pending => 0,
            Cloned => 1,
            Built => 2,
            DefinitionWritten => 3,
            InteropCompiled => 4,
            BuildOnlyDone | PackagePrepared => 5,
            Published => 6,
            Done | Failed => 7,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Pending => "Pending",
            PipelineState::Cloned => "Cloned",
            PipelineState::Built => "Built",
            PipelineState::DefinitionWritten => "DefinitionWritten",
            PipelineState::InteropCompiled => "InteropCompiled",
            PipelineState::BuildOnlyDone => "BuildOnlyDone",
            PipelineState::PackagePrepared => "PackagePrepared",
            PipelineState::Published => "Published",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// A pipeline step that was skipped because its output already existed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Clone,
    Build,
    Definition,
    Package,
}

/// Outcome of one repository's pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub handle: String,
    pub state: PipelineState,
    /// Last non-terminal state the pipeline reached
    pub last_state: PipelineState,
    pub skipped: Vec<Step>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
