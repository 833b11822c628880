//! Source checkout
//!
//! Repositories are shallow-cloned with git into their folder under the
//! build root.

use kncr_core::Repository;

/// Command cloning `repo` into its folder, run from the build root
pub fn clone_command(repo: &Repository) -> String {
    let mut command = String::from("git clone --depth 1");

    if let Some(reference) = &repo.source.reference {
        command.push_str(" --branch ");
        command.push_str(reference);
    }

    command.push(' ');
    command.push_str(&repo.source.url);
    command.push(' ');
    command.push_str(&repo.folder);
    command
}
