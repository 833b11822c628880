//! Build command resolution
//!
//! Turns a repository declaration into the concrete command lines that build
//! it, either from the catalog recipe of its type or from its inline
//! `build-cmds`.

use kncr_core::{CommandCatalog, Platform, Repository};
use std::path::Path;

use crate::error::PipelineError;

/// Extra parameter of the cmake configure step
const CMAKE_CONFIG_KEY: &str = "config-flags";

/// Resolves the ordered build commands of a repository
///
/// Fails without side effects when the type is unknown or a custom
/// repository has no `build-cmds`.
pub fn resolve_build_commands(
    repo: &Repository,
    catalog: &CommandCatalog,
    platform: &Platform,
    prefix_root: Option<&Path>,
) -> Result<Vec<String>, PipelineError> {
    if repo.is_custom() {
        return Ok(repo.custom_commands()?);
    }

    let templates = catalog.lookup(&repo.build_type)?;

    Ok(templates
        .iter()
        .map(|template| {
            let mut command = template.resolve(&repo.extra);

            if repo.build_type == "cmake" && template.uses_extra(CMAKE_CONFIG_KEY) {
                if platform.is_windows() {
                    command.push_str(" -G \"MinGW Makefiles\"");
                }
                if let Some(root) = prefix_root {
                    command.push_str(&format!(" -DCMAKE_PREFIX_PATH={}", root.display()));
                }
            }

            command
        })
        .collect())
}
