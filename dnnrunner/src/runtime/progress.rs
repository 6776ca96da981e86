use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Snapshot of how far a run has advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Instructions completed so far.
    pub processed: usize,
    pub total: usize,
    /// Wall time since the run started.
    pub elapsed_ms: u64,
    /// Set only on the terminating notification.
    pub finished: bool,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {}/{} kernels in {} ms",
            self.processed, self.total, self.elapsed_ms
        )
    }
}

/// Receives progress notifications emitted during a run.
pub trait ProgressSink: Send {
    fn report(&mut self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&Progress) + Send,
{
    fn report(&mut self, progress: &Progress) {
        (self)(progress)
    }
}

/// Default sink: one log line per notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, progress: &Progress) {
        crate::log!("{}", progress);
    }
}

#[derive(Debug)]
pub(crate) struct ProgressClock {
    started: Instant,
    last_report: Instant,
    interval: Duration,
}

impl ProgressClock {
    pub(crate) fn start(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_report: now,
            interval,
        }
    }

    /// Returns a notification when at least one interval has passed since
    /// the previous one.
    pub(crate) fn poll(&mut self, processed: usize, total: usize) -> Option<Progress> {
        let now = Instant::now();
        if now.duration_since(self.last_report) < self.interval {
            return None;
        }
        self.last_report = now;
        Some(Progress {
            processed,
            total,
            elapsed_ms: millis(now.duration_since(self.started)),
            finished: false,
        })
    }

    pub(crate) fn finish(&self, total: usize) -> Progress {
        Progress {
            processed: total,
            total,
            elapsed_ms: millis(self.started.elapsed()),
            finished: true,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
