//! Run configuration
//!
//! Defines every setting of an orchestrator run: where repositories are
//! built, what happens to the produced artifacts, how many pipelines run at
//! once and which configuration files replace the bundled ones.

use kncr_core::{Repository, Task};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default Maven group of published artifacts
pub const DEFAULT_GROUP_ID: &str = "xyz.calcugames.kncr";

/// What happens to sibling pipelines when one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep running the other repositories and report at the end
    #[default]
    Isolate,
    /// Abort every remaining pipeline on the first failure
    FailFast,
}

/// Remote Maven repository used by `deploy`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenTarget {
    pub remote_url: String,
    pub repository_id: String,
}

/// Maven coordinates shared by every published artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCoordinates {
    pub group_id: String,
    /// Fallback version when a repository does not declare one
    pub version: String,
}

impl Default for PublishCoordinates {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory every repository is cloned and built under
    pub build_root: PathBuf,

    pub maven: MavenTarget,

    /// What to do with produced artifacts
    pub task: Task,

    /// Maximum number of concurrently running pipelines, 0 for unbounded
    pub parallelism: usize,

    /// Repository list file, bundled list when `None`
    pub repositories_path: Option<PathBuf>,

    /// Command catalog file, bundled catalog when `None`
    pub catalog_path: Option<PathBuf>,

    pub failure_policy: FailurePolicy,

    /// Restricts the run to these handles when not empty
    pub only: Vec<String>,

    pub publish: PublishCoordinates,

    /// How often a running process is reported in debug logs
    pub heartbeat_interval: Duration,

    /// How often the in-flight pipeline count is reported in debug logs
    pub monitor_interval: Duration,
}

impl Config {
    /// Creates a configuration with default options
    pub fn new(build_root: PathBuf, maven: MavenTarget, task: Task, parallelism: usize) -> Self {
        Self {
            build_root,
            maven,
            task,
            parallelism,
            repositories_path: None,
            catalog_path: None,
            failure_policy: FailurePolicy::default(),
            only: Vec::new(),
            publish: PublishCoordinates::default(),
            heartbeat_interval: Duration::from_secs(5),
            monitor_interval: Duration::from_secs(5),
        }
    }

    /// Sets the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Applies the `only` filter to the loaded repository list
    ///
    /// Every requested handle must exist; order follows the repository list.
    pub fn select_repositories(
        &self,
        repositories: Vec<Repository>,
    ) -> Result<Vec<Repository>, ConfigError> {
        if self.only.is_empty() {
            return Ok(repositories);
        }

        if let Some(unknown) = self
            .only
            .iter()
            .find(|handle| !repositories.iter().any(|r| &r.handle == *handle))
        {
            return Err(ConfigError::UnknownHandle(unknown.clone()));
        }

        Ok(repositories
            .into_iter()
            .filter(|r| self.only.contains(&r.handle))
            .collect())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build_root.as_os_str().is_empty() {
            return Err(ConfigError::Empty("build_root"));
        }

        if self.task == Task::Deploy {
            if self.maven.repository_id.is_empty() {
                return Err(ConfigError::Empty("maven_repository_id"));
            }

            let url = &self.maven.remote_url;
            if !["http://", "https://", "file:"]
                .iter()
                .any(|scheme| url.starts_with(scheme))
            {
                return Err(ConfigError::Invalid {
                    field: "maven_remote_url",
                    reason: format!("'{}' must start with http://, https:// or file:", url),
                });
            }
        }

        if self.publish.group_id.is_empty() {
            return Err(ConfigError::Empty("group_id"));
        }

        if self.publish.version.is_empty() {
            return Err(ConfigError::Empty("version"));
        }

        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "heartbeat_interval",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.monitor_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "monitor_interval",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
