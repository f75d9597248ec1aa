//! Throttled status reporting

use rejoin_api::StatusSnapshot;
use rejoin_host_api::Reporter;
use rejoin_util::{MonotonicInstant, ReportThrottle};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sends snapshots through a [`Reporter`], at most once per interval.
///
/// Cheap to clone; clones share one throttle.
#[derive(Clone)]
pub struct ReportingTask {
    reporter: Arc<dyn Reporter>,
    throttle: Arc<Mutex<ReportThrottle>>,
}

impl ReportingTask {
    pub fn new(reporter: Arc<dyn Reporter>, min_interval: Duration) -> Self {
        Self {
            reporter,
            throttle: Arc::new(Mutex::new(ReportThrottle::new(min_interval))),
        }
    }

    fn throttle(&self) -> MutexGuard<'_, ReportThrottle> {
        self.throttle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn a send if the throttle allows it.
    ///
    /// Returns `None` when throttled. The send is detached; a failure is
    /// logged and releases the reservation.
    pub fn trigger(&self, snapshot: StatusSnapshot) -> Option<JoinHandle<()>> {
        let now = MonotonicInstant::now();
        {
            let mut throttle = self.throttle();
            if !throttle.try_acquire(now) {
                debug!(
                    remaining_secs = throttle.remaining(now).as_secs(),
                    "Report throttled"
                );
                return None;
            }
        }

        let task = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = task.reporter.report(&snapshot).await {
                warn!(error = %e, "Status report failed");
                task.throttle().rollback(now);
            }
        }))
    }
}
