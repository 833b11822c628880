//! External tool discovery
//!
//! Locates the interop compiler and the Maven client from their home
//! directories and builds the command lines the pipeline runs with them.

use kncr_core::{Platform, Repository, Task};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{MavenTarget, PublishCoordinates};
use crate::error::RunnerError;
use crate::process::{CommandExecutor, OutputMode};

/// Home of the Kotlin/Native distribution (`bin/cinterop`)
pub const NATIVE_HOME_ENV: &str = "KOTLIN_NATIVE_HOME";

/// Home of the Maven distribution (`bin/mvn`)
pub const MAVEN_HOME_ENV: &str = "MAVEN_HOME";

/// Alternate toolchain root added to the cmake prefix path
pub const TOOLCHAIN_ROOT_ENV: &str = "KNCR_TOOLCHAIN_ROOT";

/// Resolved tool locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Interop compiler executable
    pub cinterop: String,
    /// Maven client executable
    pub mvn: String,
    /// Extra cmake prefix path, if any
    pub prefix_root: Option<PathBuf>,
}

impl Toolchain {
    /// Resolves tools from explicit home directories
    ///
    /// Without a home directory the bare tool name is used and looked up on
    /// `PATH`.
    pub fn resolve(
        platform: &Platform,
        native_home: Option<&Path>,
        maven_home: Option<&Path>,
        prefix_root: Option<PathBuf>,
    ) -> Self {
        let (cinterop_suffix, mvn_suffix) = if platform.is_windows() {
            (".bat", ".cmd")
        } else {
            ("", "")
        };

        let tool = |home: Option<&Path>, name: String| match home {
            Some(home) => home.join("bin").join(name).display().to_string(),
            None => name,
        };

        Self {
            cinterop: tool(native_home, format!("cinterop{}", cinterop_suffix)),
            mvn: tool(maven_home, format!("mvn{}", mvn_suffix)),
            prefix_root,
        }
    }

    /// Resolves tools from the process environment
    pub fn from_env(platform: &Platform) -> Self {
        let env_path = |key: &str| {
            std::env::var_os(key)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };

        let toolchain = Self::resolve(
            platform,
            env_path(NATIVE_HOME_ENV).as_deref(),
            env_path(MAVEN_HOME_ENV).as_deref(),
            env_path(TOOLCHAIN_ROOT_ENV),
        );

        debug!("Using CInterop command: {}", toolchain.cinterop);
        debug!("Using Maven command: {}", toolchain.mvn);
        if let Some(root) = &toolchain.prefix_root {
            debug!("Using toolchain root: {}", root.display());
        }

        toolchain
    }

    /// Checks that the tools needed for `task` can be started
    ///
    /// Output is streamed to the console so the versions end up in the log.
    pub async fn verify(
        &self,
        executor: &dyn CommandExecutor,
        dir: &Path,
        task: Task,
    ) -> Result<(), RunnerError> {
        info!("Checking toolchain");
        executor
            .run(&format!("{} -help", self.cinterop), dir, OutputMode::Piped)
            .await?;

        if task.publishes() {
            executor
                .run(&format!("{} --version", self.mvn), dir, OutputMode::Piped)
                .await?;
        }

        Ok(())
    }

    /// Command compiling `<name>.def` into `<name>.klib`
    pub fn cinterop_command(&self, repo: &Repository) -> String {
        format!(
            "{} -def {} -o {}",
            self.cinterop,
            repo.definition_file(),
            repo.klib_file()
        )
    }

    /// Command installing or deploying `<name>.klib` with its POM
    ///
    /// Returns `None` for [`Task::Build`], which never publishes.
    pub fn publish_command(
        &self,
        task: Task,
        repo: &Repository,
        target: &MavenTarget,
    ) -> Option<String> {
        let file = repo.klib_file();
        let pom = repo.pom_file();

        match task {
            Task::Build => None,
            Task::Install => Some(format!(
                "{} install:install-file -Dfile={} -DpomFile={} -Dpackaging=klib -DcreateChecksum=true",
                self.mvn, file, pom
            )),
            Task::Deploy => Some(format!(
                "{} deploy:deploy-file -Dfile={} -DpomFile={} -Durl={} -DrepositoryId={} -Dpackaging=klib",
                self.mvn, file, pom, target.remote_url, target.repository_id
            )),
        }
    }
}

/// Version published for a repository
///
/// A `version` extra parameter wins over the run-wide default.
pub fn publish_version<'a>(repo: &'a Repository, coordinates: &'a PublishCoordinates) -> &'a str {
    repo.extra("version").unwrap_or(&coordinates.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kncr_core::{Arch, Os};

    use crate::testing::repository;

    #[test]
    fn test_resolve_without_homes() {
        let platform = Platform::new(Os::Linux, Arch::X64);
        let toolchain = Toolchain::resolve(&platform, None, None, None);

        assert_eq!(toolchain.cinterop, "cinterop");
        assert_eq!(toolchain.mvn, "mvn");
        assert_eq!(toolchain.prefix_root, None);
    }

    #[test]
    fn test_resolve_with_homes() {
        let platform = Platform::new(Os::Linux, Arch::X64);
        let toolchain = Toolchain::resolve(
            &platform,
            Some(Path::new("/opt/kotlin-native")),
            Some(Path::new("/opt/maven")),
            None,
        );

        assert_eq!(
            PathBuf::from(&toolchain.cinterop),
            Path::new("/opt/kotlin-native").join("bin").join("cinterop")
        );
        assert_eq!(
            PathBuf::from(&toolchain.mvn),
            Path::new("/opt/maven").join("bin").join("mvn")
        );
    }

    #[test]
    fn test_windows_suffixes() {
        let platform = Platform::new(Os::Windows, Arch::X64);
        let toolchain = Toolchain::resolve(&platform, None, None, None);

        assert_eq!(toolchain.cinterop, "cinterop.bat");
        assert_eq!(toolchain.mvn, "mvn.cmd");
    }

    #[test]
    fn test_cinterop_command() {
        let platform = Platform::new(Os::Linux, Arch::X64);
        let toolchain = Toolchain::resolve(&platform, None, None, None);
        let repo = repository("zlib", "make");

        assert_eq!(
            toolchain.cinterop_command(&repo),
            "cinterop -def zlib.def -o zlib.klib"
        );
    }

    #[test]
    fn test_publish_commands() {
        let platform = Platform::new(Os::Linux, Arch::X64);
        let toolchain = Toolchain::resolve(&platform, None, None, None);
        let repo = repository("zlib", "make");
        let target = MavenTarget {
            remote_url: "https://repo.example.com/kncr/".to_string(),
            repository_id: "example".to_string(),
        };

        assert_eq!(toolchain.publish_command(Task::Build, &repo, &target), None);
        assert_eq!(
            toolchain.publish_command(Task::Install, &repo, &target).unwrap(),
            "mvn install:install-file -Dfile=zlib.klib -DpomFile=zlib.pom -Dpackaging=klib -DcreateChecksum=true"
        );
        assert_eq!(
            toolchain.publish_command(Task::Deploy, &repo, &target).unwrap(),
            "mvn deploy:deploy-file -Dfile=zlib.klib -DpomFile=zlib.pom \
             -Durl=https://repo.example.com/kncr/ -DrepositoryId=example -Dpackaging=klib"
        );
    }

    #[test]
    fn test_publish_version_override() {
        let coordinates = PublishCoordinates::default();
        let mut repo = repository("zlib", "make");
        assert_eq!(publish_version(&repo, &coordinates), coordinates.version);

        repo.extra.insert("version".to_string(), "1.3.1".to_string());
        assert_eq!(publish_version(&repo, &coordinates), "1.3.1");
    }
}
