//! Pipeline orchestrator
//!
//! Runs every repository's pipeline concurrently. The run future is the single
//! parent owning one child task per repository; the children are independent
//! and a failed pipeline does not touch its siblings unless the run is
//! fail-fast.

use kncr_core::{PipelineReport, Repository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Level, error, info, info_span, warn};

use crate::config::FailurePolicy;
use crate::scheduler::monitor::{InFlight, watch_in_flight};
use crate::service::PipelineService;

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports of every pipeline that ran to an end, in completion order
    pub reports: Vec<PipelineReport>,
    /// Pipelines aborted by a fail-fast run
    pub aborted: usize,
    /// Pipeline tasks that panicked
    pub panicked: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.succeeded()).count()
    }

    /// Pipelines that did not succeed for any reason
    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded() + self.aborted + self.panicked
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Logs one line per failed repository and a closing total
    pub fn log(&self) {
        for report in self.reports.iter().filter(|r| !r.succeeded()) {
            error!(
                "'{}' failed at {}: {}",
                report.handle,
                report.last_state,
                report.error.as_deref().unwrap_or("unknown error")
            );
        }

        if self.aborted > 0 {
            warn!("{} pipeline(s) aborted", self.aborted);
        }

        info!(
            "Finished KNCR work: {} succeeded, {} failed",
            self.succeeded(),
            self.failed()
        );
    }
}

/// Fans repositories out to concurrent pipelines
pub struct Orchestrator {
    pipeline: Arc<dyn PipelineService>,
    parallelism: usize,
    policy: FailurePolicy,
    monitor_interval: Duration,
    in_flight: Arc<InFlight>,
}

impl Orchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    /// * `pipeline` - Runs a single repository
    /// * `parallelism` - Maximum concurrently running pipelines, 0 for unbounded
    /// * `policy` - What to do with siblings of a failed pipeline
    pub fn new(
        pipeline: Arc<dyn PipelineService>,
        parallelism: usize,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            pipeline,
            parallelism,
            policy,
            monitor_interval: Duration::from_secs(5),
            in_flight: Arc::new(InFlight::new()),
        }
    }

    /// Sets how often the in-flight count is logged in debug mode
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Live pipeline counter
    pub fn in_flight(&self) -> Arc<InFlight> {
        Arc::clone(&self.in_flight)
    }

    /// Runs every repository's pipeline to completion
    ///
    /// This future is the parent of every pipeline task. Dropping it aborts
    /// the pipelines still running.
    pub async fn run(&self, repositories: Vec<Repository>) -> RunSummary {
        info!("Starting KNCR work on {} repositories", repositories.len());
        if self.parallelism > 0 {
            info!("Running with at most {} concurrent pipelines", self.parallelism);
        }

        let children = Self::run_children(
            Arc::clone(&self.pipeline),
            repositories,
            self.parallelism,
            self.policy,
            Arc::clone(&self.in_flight),
        );

        if !tracing::enabled!(Level::DEBUG) {
            return children.await;
        }

        let monitor = watch_in_flight(Arc::clone(&self.in_flight), self.monitor_interval);
        tokio::pin!(children, monitor);

        tokio::select! {
            biased;
            summary = &mut children => summary,
            never = &mut monitor => match never {},
        }
    }

    /// Spawns and joins one child per repository
    async fn run_children(
        pipeline: Arc<dyn PipelineService>,
        repositories: Vec<Repository>,
        parallelism: usize,
        policy: FailurePolicy,
        in_flight: Arc<InFlight>,
    ) -> RunSummary {
        let semaphore = (parallelism > 0).then(|| Arc::new(Semaphore::new(parallelism)));
        let mut children = JoinSet::new();

        for repo in repositories {
            let pipeline = Arc::clone(&pipeline);
            let semaphore = semaphore.clone();
            let in_flight = Arc::clone(&in_flight);
            let span = info_span!("pipeline", repo = %repo.handle);

            children.spawn(
                async move {
                    let _guard = in_flight.enter();

                    // Permit is released when dropped
                    let _permit = match semaphore {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };

                    pipeline.run(&repo).await
                }
                .instrument(span),
            );
        }

        let mut summary = RunSummary::default();

        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(report) => {
                    let failed = !report.succeeded();
                    summary.reports.push(report);

                    if failed && policy == FailurePolicy::FailFast && !children.is_empty() {
                        error!("Aborting {} remaining pipeline(s)", children.len());
                        children.abort_all();
                    }
                }
                Err(e) if e.is_cancelled() => summary.aborted += 1,
                Err(e) => {
                    error!("Pipeline task panicked: {}", e);
                    summary.panicked += 1;
                }
            }
        }

        summary
    }
}
