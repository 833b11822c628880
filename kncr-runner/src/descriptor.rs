//! Generated descriptor files
//!
//! Renders the two transient text files of a pipeline: the interop
//! definition file read by `cinterop`, and the POM handed to Maven when the
//! klib is published.

use kncr_core::{Platform, Repository};

use crate::config::PublishCoordinates;
use crate::toolchain::publish_version;

/// Renders `<name>.def` from the repository's extra parameters
///
/// Keys without a value are left out, except the compiler and linker options
/// which always carry the platform defaults.
pub fn render_definition(repo: &Repository, platform: &Platform) -> String {
    let join = |own: Option<&str>, defaults: &str| match own {
        Some(own) if !own.trim().is_empty() => format!("{} {}", own.trim(), defaults),
        _ => defaults.to_string(),
    };

    let mut lines = Vec::new();
    let mut push = |key: &str, value: Option<&str>| {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            lines.push(format!("{} = {}", key, value));
        }
    };

    push("headers", repo.extra("headers"));
    push("headerFilter", repo.extra("header-filter"));
    push("package", Some(repo.extra("package").unwrap_or(&repo.name)));
    push(
        "compilerOpts",
        Some(&join(repo.extra("compiler-opts"), platform.compiler_opts())),
    );
    push(
        "linkerOpts",
        Some(&join(repo.extra("linker-opts"), platform.linker_opts())),
    );
    push("staticLibraries", repo.extra("static-libs"));
    push("libraryPaths", repo.extra("lib-paths"));

    let mut definition = lines.join("\n");
    definition.push('\n');
    definition
}

/// Renders `<name>.pom` describing the published klib
pub fn render_pom(
    repo: &Repository,
    platform: &Platform,
    coordinates: &PublishCoordinates,
) -> String {
    let artifact_id = format!("{}-{}", repo.name, platform.classifier());

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{group}</groupId>
  <artifactId>{artifact}</artifactId>
  <version>{version}</version>
  <packaging>klib</packaging>
  <name>{name}</name>
  <description>Kotlin/Native cinterop bindings for {handle} ({platform})</description>
  <url>{url}</url>
</project>
"#,
        group = escape_xml(&coordinates.group_id),
        artifact = escape_xml(&artifact_id),
        version = escape_xml(publish_version(repo, coordinates)),
        name = escape_xml(&repo.name),
        handle = escape_xml(&repo.handle),
        platform = platform,
        url = escape_xml(&repo.source.url),
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
