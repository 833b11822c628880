//! In-flight pipeline tracking
//!
//! Every pipeline task holds an [`InFlightGuard`] for as long as it lives.
//! The monitor only reads the counter, it never influences scheduling.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Number of pipeline tasks currently alive
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the caller until the returned guard is dropped
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(self),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count on drop, including when a task is aborted
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Logs the in-flight count every `interval`
///
/// Never completes; it stops when the caller drops it.
pub async fn watch_in_flight(in_flight: Arc<InFlight>, interval: Duration) -> Infallible {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        debug!("Parent task running with {} pipeline(s) in flight", in_flight.count());
    }
}
