//! Test helpers shared by the runner's unit tests

use async_trait::async_trait;
use kncr_core::{CloneSource, Repository};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::RunnerError;
use crate::process::{CommandExecutor, OutputMode, split_command};

/// Repository named `name`, living in folder `name`
pub fn repository(name: &str, build_type: &str) -> Repository {
    Repository {
        handle: format!("test/{}", name),
        name: name.to_string(),
        folder: name.to_string(),
        build_type: build_type.to_string(),
        extra: HashMap::new(),
        source: CloneSource {
            url: format!("https://example.com/{}.git", name),
            reference: None,
        },
    }
}

/// A command seen by [`StubExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub command: String,
    pub dir: PathBuf,
    pub mode: OutputMode,
}

/// Executor that records commands instead of running them
///
/// It simulates the side effects the pipeline relies on: `git clone` creates
/// the target folder and `cinterop ... -o <file>` creates the klib.
#[derive(Default)]
pub struct StubExecutor {
    recorded: Mutex<Vec<Recorded>>,
    fail_on: Option<String>,
    hold: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every command containing `needle` with exit code 1
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    /// Keeps every command in flight for `hold`
    pub fn holding(hold: Duration) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .map(|r| r.command)
            .collect()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    /// Highest number of commands observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn simulate(&self, command_line: &str, dir: &Path) {
        let parts = split_command(command_line);

        if parts.starts_with(&["git", "clone"]) {
            if let Some(folder) = parts.last() {
                std::fs::create_dir_all(dir.join(folder)).unwrap();
            }
        }

        if parts.iter().any(|p| *p == "-def") {
            let output = parts
                .iter()
                .position(|p| *p == "-o")
                .and_then(|pos| parts.get(pos + 1));
            if let Some(output) = output {
                std::fs::write(dir.join(output), b"klib").unwrap();
            }
        }
    }
}

#[async_trait]
impl CommandExecutor for StubExecutor {
    async fn run(
        &self,
        command_line: &str,
        dir: &Path,
        mode: OutputMode,
    ) -> Result<String, RunnerError> {
        self.recorded.lock().unwrap().push(Recorded {
            command: command_line.to_string(),
            dir: dir.to_path_buf(),
            mode,
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(needle) = &self.fail_on {
            if command_line.contains(needle.as_str()) {
                return Err(RunnerError::new(command_line, dir, 1, "stub failure"));
            }
        }

        self.simulate(command_line, dir);
        Ok(String::new())
    }
}

/// Collects formatted log lines so tests can assert on them
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Installs a debug-level subscriber writing into this capture for the
    /// current thread until the guard is dropped
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Lines containing `needle`
    pub fn lines_with(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
