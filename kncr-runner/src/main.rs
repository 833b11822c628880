//! KNCR
//!
//! Clones, builds and packages Kotlin/Native cinterop klibs for every
//! declared C/C++ repository, then installs or deploys them with Maven.
//!
//! Usage: `kncr <build-root> <maven-remote> <maven-repository-id> <task> <parallelism>`

use anyhow::{Context, Result};
use clap::Parser;
use kncr_core::{CommandCatalog, Platform, SharedCatalog, Task, load_repositories};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use kncr_runner::config::{DEFAULT_GROUP_ID, Config, FailurePolicy, MavenTarget};
use kncr_runner::{
    CommandExecutor, Orchestrator, PipelineSettings, ProcessRunner, StandardPipelineService,
    Toolchain,
};

#[derive(Parser)]
#[command(name = "kncr")]
#[command(about = "Kotlin/Native cinterop repository builder", long_about = None)]
struct Cli {
    /// Directory repositories are cloned and built in
    build_root: PathBuf,

    /// Remote Maven repository URL used by `deploy`
    maven_remote: String,

    /// Server id of the remote repository in the Maven settings
    maven_repository_id: String,

    /// What to do with the produced klibs: build, install or deploy
    task: Task,

    /// Maximum number of concurrent pipelines, 0 for unbounded
    parallelism: usize,

    /// Repository list replacing the bundled one
    #[arg(long, env = "KNCR_REPOSITORIES")]
    repositories: Option<PathBuf>,

    /// Build-system command catalog replacing the bundled one
    #[arg(long, env = "KNCR_CATALOG")]
    catalog: Option<PathBuf>,

    /// Abort every pipeline as soon as one fails
    #[arg(long, env = "KNCR_FAIL_FAST")]
    fail_fast: bool,

    /// Only run the repository with this handle (repeatable)
    #[arg(long = "only", value_name = "HANDLE")]
    only: Vec<String>,

    /// Maven group of published artifacts
    #[arg(long, default_value = DEFAULT_GROUP_ID)]
    group_id: String,

    /// Version of published artifacts that do not declare one
    #[arg(long)]
    publish_version: Option<String>,

    /// Enable debug logging, process heartbeats and the pipeline monitor
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(
            self.build_root,
            MavenTarget {
                remote_url: self.maven_remote,
                repository_id: self.maven_repository_id,
            },
            self.task,
            self.parallelism,
        );

        config.repositories_path = self.repositories;
        config.catalog_path = self.catalog;
        config.only = self.only;
        config.publish.group_id = self.group_id;
        if let Some(version) = self.publish_version {
            config.publish.version = version;
        }

        let policy = if self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Isolate
        };
        config.with_failure_policy(policy)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "kncr=debug,kncr_runner=debug,kncr_core=debug"
    } else {
        "kncr=info,kncr_runner=info,kncr_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    config.validate().context("Invalid configuration")?;

    let span = info_span!("run", run_id = %Uuid::new_v4());
    run(config).instrument(span).await
}

async fn run(config: Config) -> Result<()> {
    let platform = Platform::host().context("Failed to detect host platform")?;
    info!("Starting KNCR for {}", platform);
    debug!("Build directory: {}", config.build_root.display());
    debug!("Maven remote URL: {}", config.maven.remote_url);
    debug!("Maven repository ID: {}", config.maven.repository_id);
    info!("Running task '{}'", config.task);

    tokio::fs::create_dir_all(&config.build_root)
        .await
        .with_context(|| {
            format!(
                "Failed to create build directory {}",
                config.build_root.display()
            )
        })?;

    let runner = Arc::new(ProcessRunner::new(config.heartbeat_interval));
    let toolchain = Toolchain::from_env(&platform);
    toolchain
        .verify(runner.as_ref(), &config.build_root, config.task)
        .await
        .context("Toolchain check failed")?;

    let catalog = CommandCatalog::load(config.catalog_path.as_deref())
        .context("Failed to load build systems")?;
    let repositories = load_repositories(config.repositories_path.as_deref())
        .context("Failed to load repositories")?;
    let repositories = config.select_repositories(repositories)?;

    let settings = PipelineSettings {
        build_root: config.build_root.clone(),
        task: config.task,
        maven: config.maven.clone(),
        publish: config.publish.clone(),
        platform,
        toolchain,
    };
    let executor: Arc<dyn CommandExecutor> = runner;
    let pipeline = Arc::new(StandardPipelineService::new(
        settings,
        Arc::new(SharedCatalog::new(catalog)),
        executor,
    ));

    let orchestrator = Orchestrator::new(pipeline, config.parallelism, config.failure_policy)
        .with_monitor_interval(config.monitor_interval);

    let summary = orchestrator.run(repositories).await;
    summary.log();

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} repositories failed",
            summary.failed(),
            summary.reports.len() + summary.aborted + summary.panicked
        );
    }

    Ok(())
}
