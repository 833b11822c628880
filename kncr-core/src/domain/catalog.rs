//! Build-system command catalog
//!
//! Maps a build-system type (`cmake`, `make`, ...) to the ordered list of
//! command templates that build a repository of that type. The catalog is
//! loaded once at startup and only ever replaced as a whole.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::resources;

/// Reserved type meaning "run the repository's inline `build-cmds`"
pub const CUSTOM_TYPE: &str = "custom";

/// A single command of a build recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Base command line
    pub cmd: String,

    /// Name of the repository `extra` parameter appended to `cmd`
    #[serde(default)]
    pub extra: Option<String>,
}

impl CommandTemplate {
    /// Creates a template with an extra parameter
    pub fn new(cmd: impl Into<String>, extra: Option<&str>) -> Self {
        Self {
            cmd: cmd.into(),
            extra: extra.map(str::to_string),
        }
    }

    /// Returns true if this template splices in the given extra parameter
    pub fn uses_extra(&self, key: &str) -> bool {
        self.extra.as_deref() == Some(key)
    }

    /// Resolves the template against a repository's extra parameters
    ///
    /// A missing parameter resolves to the empty string.
    pub fn resolve(&self, extra: &HashMap<String, String>) -> String {
        let value = self
            .extra
            .as_deref()
            .and_then(|key| extra.get(key))
            .map(String::as_str)
            .unwrap_or("");

        format!("{} {}", self.cmd, value).trim().to_string()
    }
}

/// Immutable mapping from build-system type to its command recipe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandCatalog {
    types: HashMap<String, Vec<CommandTemplate>>,
}

impl CommandCatalog {
    /// Creates a catalog from an already built map
    pub fn new(types: HashMap<String, Vec<CommandTemplate>>) -> Self {
        Self { types }
    }

    /// Parses a catalog from its JSON representation
    pub fn from_json(source: &str) -> Result<Self, CatalogError> {
        let types: HashMap<String, Vec<CommandTemplate>> =
            serde_json::from_str(source).map_err(|e| CatalogError::Malformed(e.to_string()))?;

        if types.contains_key(CUSTOM_TYPE) {
            return Err(CatalogError::Malformed(format!(
                "'{}' is reserved and cannot be declared in the catalog",
                CUSTOM_TYPE
            )));
        }

        for (build_type, commands) in &types {
            if commands.iter().any(|c| c.cmd.trim().is_empty()) {
                return Err(CatalogError::Malformed(format!(
                    "build system '{}' contains an empty command",
                    build_type
                )));
            }
        }

        Ok(Self { types })
    }

    /// Loads the catalog from `path`, or the bundled catalog when `None`
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        info!("Loading build systems...");

        let catalog = match path {
            Some(path) => {
                let source =
                    std::fs::read_to_string(path).map_err(|source| CatalogError::Missing {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_json(&source)?
            }
            None => Self::from_json(resources::BUILDS_JSON)?,
        };

        debug!("Build types: {}", catalog.len());
        info!("Finished loading build systems");
        Ok(catalog)
    }

    /// Returns the command recipe for a build-system type
    pub fn lookup(&self, build_type: &str) -> Result<&[CommandTemplate], CatalogError> {
        self.types
            .get(build_type)
            .map(Vec::as_slice)
            .ok_or_else(|| CatalogError::UnknownType(build_type.to_string()))
    }

    /// Returns true if the catalog declares the given type
    pub fn contains(&self, build_type: &str) -> bool {
        self.types.contains_key(build_type)
    }

    /// Number of declared build-system types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Catalog handle shared by all pipelines
///
/// Readers take a snapshot and keep it for the rest of their work; a reload
/// swaps the whole catalog so no reader ever sees a partial update.
#[derive(Debug)]
pub struct SharedCatalog {
    current: RwLock<Arc<CommandCatalog>>,
}

impl SharedCatalog {
    pub fn new(catalog: CommandCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Returns the catalog currently in effect
    pub fn snapshot(&self) -> Arc<CommandCatalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replaces the entire catalog
    pub fn replace(&self, catalog: CommandCatalog) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(catalog);
    }
}
