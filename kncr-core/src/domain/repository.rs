//! Repository domain model
//!
//! A repository is one buildable third-party library: where its sources come
//! from, how to build it and what the produced interop artifact is called.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::domain::catalog::CUSTOM_TYPE;
use crate::error::RepositoryError;
use crate::resources;

/// Extra parameter holding the inline commands of a custom repository
pub const BUILD_CMDS_KEY: &str = "build-cmds";

/// Where the sources of a repository are cloned from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneSource {
    /// Git remote URL
    pub url: String,

    /// Branch or tag to check out, default branch when absent
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
}

/// One buildable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Stable human identifier used in logs and reports
    pub handle: String,

    /// Artifact base name (`<name>.def`, `<name>.klib`, `<name>.pom`)
    pub name: String,

    /// Directory under the build root holding the sources
    pub folder: String,

    /// Build-system type, or `custom` for inline commands
    #[serde(rename = "type")]
    pub build_type: String,

    /// Free-form template parameters
    #[serde(default)]
    pub extra: HashMap<String, String>,

    /// Clone descriptor
    #[serde(rename = "clone")]
    pub source: CloneSource,
}

impl Repository {
    /// Returns true if this repository builds with inline commands
    pub fn is_custom(&self) -> bool {
        self.build_type == CUSTOM_TYPE
    }

    /// Directory of this repository under the build root
    pub fn dir(&self, build_root: &Path) -> PathBuf {
        build_root.join(&self.folder)
    }

    pub fn definition_file(&self) -> String {
        format!("{}.def", self.name)
    }

    pub fn klib_file(&self) -> String {
        format!("{}.klib", self.name)
    }

    pub fn pom_file(&self) -> String {
        format!("{}.pom", self.name)
    }

    /// Looks up an extra parameter
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Inline commands of a custom repository, one per non-blank line
    pub fn custom_commands(&self) -> Result<Vec<String>, RepositoryError> {
        let commands = self
            .extra(BUILD_CMDS_KEY)
            .ok_or_else(|| RepositoryError::MissingBuildCommands(self.handle.clone()))?;

        Ok(commands
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Checks that `name` and `folder` are safe to join onto the build root
    /// and to pass through whitespace-split command lines
    pub fn validate(&self) -> Result<(), RepositoryError> {
        let unsafe_path = |field: &'static str, value: &str| RepositoryError::UnsafePath {
            handle: self.handle.clone(),
            field,
            value: value.to_string(),
        };

        if self.name.is_empty()
            || self.name == "."
            || self.name == ".."
            || self.name.contains(['/', '\\', ':'])
            || self.name.contains(char::is_whitespace)
        {
            return Err(unsafe_path("name", &self.name));
        }

        let folder = Path::new(&self.folder);
        let only_normal = folder
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if self.folder.is_empty()
            || folder.is_absolute()
            || !only_normal
            || self.folder.contains(char::is_whitespace)
        {
            return Err(unsafe_path("folder", &self.folder));
        }

        Ok(())
    }
}

/// Parses and validates a repository list
pub fn parse_repositories(source: &str) -> Result<Vec<Repository>, RepositoryError> {
    let repositories: Vec<Repository> =
        serde_json::from_str(source).map_err(|e| RepositoryError::Malformed(e.to_string()))?;

    let mut handles = HashSet::new();
    for repo in &repositories {
        repo.validate()?;
        if !handles.insert(repo.handle.as_str()) {
            return Err(RepositoryError::DuplicateHandle(repo.handle.clone()));
        }
    }

    Ok(repositories)
}

/// Loads the repository list from `path`, or the bundled list when `None`
pub fn load_repositories(path: Option<&Path>) -> Result<Vec<Repository>, RepositoryError> {
    let repositories = match path {
        Some(path) => {
            let source =
                std::fs::read_to_string(path).map_err(|source| RepositoryError::Missing {
                    path: path.to_path_buf(),
                    source,
                })?;
            parse_repositories(&source)?
        }
        None => parse_repositories(resources::REPOSITORIES_JSON)?,
    };

    debug!("Repositories size: {}", repositories.len());
    Ok(repositories)
}
