//! Repository pipeline service
//!
//! Takes one repository from source to published klib:
//! - Clone the sources unless the folder already exists
//! - Build with the catalog recipe or the inline commands
//! - Write the definition file and compile it with `cinterop`
//! - Discard the klib (`build`) or publish it with Maven (`install`, `deploy`)
//!
//! Every artifact step is skipped when its output is already on disk, so an
//! interrupted run resumes after the last artifact it produced.

use async_trait::async_trait;
use chrono::Utc;
use kncr_core::{PipelineReport, PipelineState, Platform, Repository, SharedCatalog, Step, Task};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{MavenTarget, PublishCoordinates};
use crate::descriptor::{render_definition, render_pom};
use crate::error::PipelineError;
use crate::process::{CommandExecutor, OutputMode};
use crate::service::build::resolve_build_commands;
use crate::service::source::clone_command;
use crate::toolchain::Toolchain;

/// Service trait for running one repository's pipeline
#[async_trait]
pub trait PipelineService: Send + Sync {
    /// Runs the full pipeline of `repo`
    ///
    /// Never fails: the outcome, including any error, is in the report.
    async fn run(&self, repo: &Repository) -> PipelineReport;
}

/// Settings shared by every pipeline of a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub build_root: PathBuf,
    pub task: Task,
    pub maven: MavenTarget,
    pub publish: PublishCoordinates,
    pub platform: Platform,
    pub toolchain: Toolchain,
}

/// Standard implementation of PipelineService
pub struct StandardPipelineService {
    settings: PipelineSettings,
    catalog: Arc<SharedCatalog>,
    executor: Arc<dyn CommandExecutor>,
}

/// State tracking of a single pipeline run
struct Progress {
    state: PipelineState,
    skipped: Vec<Step>,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: PipelineState::Pending,
            skipped: Vec::new(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("{} -> {}", self.state, next);
        self.state = next;
    }

    fn skip(&mut self, step: Step) {
        self.skipped.push(step);
    }
}

impl StandardPipelineService {
    /// Creates a new pipeline service
    ///
    /// # Arguments
    /// * `settings` - Run-wide settings
    /// * `catalog` - Command catalog, snapshotted once per pipeline
    /// * `executor` - Runs every external command
    pub fn new(
        settings: PipelineSettings,
        catalog: Arc<SharedCatalog>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            settings,
            catalog,
            executor,
        }
    }

    /// Runs a command and logs whatever it printed
    async fn run_command(
        &self,
        command: &str,
        dir: &Path,
        mode: OutputMode,
    ) -> Result<(), PipelineError> {
        debug!("Running command: {}", command);
        let output = self.executor.run(command, dir, mode).await?;

        let output = output.trim();
        if !output.is_empty() {
            debug!("{}", output);
        }

        Ok(())
    }

    async fn execute(&self, repo: &Repository, progress: &mut Progress) -> Result<(), PipelineError> {
        let settings = &self.settings;
        let repo_dir = repo.dir(&settings.build_root);

        // Configuration errors surface before anything runs
        let catalog = self.catalog.snapshot();
        let build_commands = resolve_build_commands(
            repo,
            &catalog,
            &settings.platform,
            settings.toolchain.prefix_root.as_deref(),
        )?;

        if repo_dir.exists() {
            warn!("Repository directory already exists: {}", repo_dir.display());
            progress.skip(Step::Clone);
        } else {
            debug!("Cloning into {}", repo_dir.display());
            self.run_command(&clone_command(repo), &settings.build_root, OutputMode::Captured)
                .await?;
        }
        progress.advance(PipelineState::Cloned);

        let klib_path = repo_dir.join(repo.klib_file());
        if klib_path.exists() {
            info!("Klib file already exists: {}", repo.klib_file());
            progress.skip(Step::Build);
        } else {
            self.build(repo, &repo_dir, &build_commands, progress).await?;
        }

        if settings.task == Task::Build {
            remove_artifact(&klib_path).await?;
            progress.advance(PipelineState::BuildOnlyDone);
            return Ok(());
        }

        self.publish(repo, &repo_dir, &klib_path, progress).await
    }

    /// Builds the sources and compiles them into `<name>.klib`
    async fn build(
        &self,
        repo: &Repository,
        repo_dir: &Path,
        commands: &[String],
        progress: &mut Progress,
    ) -> Result<(), PipelineError> {
        if repo.is_custom() {
            info!("Using custom build system for {}", repo.handle);
        } else {
            debug!("Using type {} for {}", repo.build_type, repo.handle);
        }

        for command in commands {
            self.run_command(command, repo_dir, OutputMode::Captured)
                .await?;
        }
        progress.advance(PipelineState::Built);

        info!("Generating definition file for {}...", repo.handle);
        let def_path = repo_dir.join(repo.definition_file());
        if def_path.exists() {
            warn!("Definition file already exists: {}", def_path.display());
            progress.skip(Step::Definition);
        } else {
            let definition = render_definition(repo, &self.settings.platform);
            tokio::fs::write(&def_path, definition)
                .await
                .map_err(|e| PipelineError::io(&def_path, e))?;
            debug!("Generated definition file: {}", def_path.display());
            progress.advance(PipelineState::DefinitionWritten);
        }

        let cinterop = self.settings.toolchain.cinterop_command(repo);
        self.run_command(&cinterop, repo_dir, OutputMode::Captured)
            .await?;

        remove_artifact(&def_path).await?;
        progress.advance(PipelineState::InteropCompiled);
        Ok(())
    }

    /// Writes the POM and hands the klib to Maven
    async fn publish(
        &self,
        repo: &Repository,
        repo_dir: &Path,
        klib_path: &Path,
        progress: &mut Progress,
    ) -> Result<(), PipelineError> {
        let settings = &self.settings;
        info!("Publishing {}...", repo.handle);

        let pom_path = repo_dir.join(repo.pom_file());
        if pom_path.exists() {
            debug!("POM file already exists: {}", pom_path.display());
            progress.skip(Step::Package);
        } else {
            let pom = render_pom(repo, &settings.platform, &settings.publish);
            tokio::fs::write(&pom_path, pom)
                .await
                .map_err(|e| PipelineError::io(&pom_path, e))?;
            debug!("Generated POM file: {}", pom_path.display());
        }
        progress.advance(PipelineState::PackagePrepared);

        if let Some(command) =
            settings
                .toolchain
                .publish_command(settings.task, repo, &settings.maven)
        {
            self.run_command(&command, repo_dir, OutputMode::Piped)
                .await?;
        }
        progress.advance(PipelineState::Published);

        remove_artifact(&pom_path).await?;
        remove_artifact(klib_path).await?;
        Ok(())
    }
}

#[async_trait]
impl PipelineService for StandardPipelineService {
    async fn run(&self, repo: &Repository) -> PipelineReport {
        info!("Starting work on '{}'", repo.handle);
        let started_at = Utc::now();
        let mut progress = Progress::new();

        let result = self.execute(repo, &mut progress).await;
        let last_state = progress.state;

        let (state, error) = match result {
            Ok(()) => {
                progress.advance(PipelineState::Done);
                info!("Finished work on '{}'", repo.handle);
                (PipelineState::Done, None)
            }
            Err(e) => {
                error!(
                    "Work on '{}' failed after reaching {}: {}",
                    repo.handle, last_state, e
                );
                (PipelineState::Failed, Some(e.to_string()))
            }
        };

        PipelineReport {
            handle: repo.handle.clone(),
            state,
            last_state,
            skipped: progress.skipped,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Deletes a transient artifact, ignoring one that is already gone
async fn remove_artifact(path: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::io(path, e)),
    }
}
