//! Resources bundled into the binary
//!
//! Used whenever no override file is given on the command line.

/// Default repository list
pub const REPOSITORIES_JSON: &str = include_str!("../resources/repositories.json");

/// Default build-system command catalog
pub const BUILDS_JSON: &str = include_str!("../resources/builds.json");
