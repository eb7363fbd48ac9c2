use crate::{ElapsedTimer, EtaEstimator};
use std::fmt::{self, Display, Formatter};
use std::time::Instant;

/// A progress notification passed to a [`ProgressObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate<'a> {
    pub current: u64,
    pub total: u64,
    pub label: &'a str,
}

/// Receives progress notifications from long-running operations.
///
/// All methods have default no-op implementations.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, _update: &ProgressUpdate<'_>) {}
}

/// No-op observer for silent operation.
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {}

/// Snapshot of progress, ready for display.
///
/// Renders as `"<current> / <total> | <pct>% | ETA: <eta>s | Elapsed: <elapsed>s | <label>"`
/// with `N/A` standing in for anything not yet known.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub current: u64,
    pub total: u64,
    pub eta_secs: Option<f64>,
    pub elapsed_secs: Option<f64>,
    pub label: String,
}

impl ProgressReport {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64 * 100.0
    }
}

impl Display for ProgressReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} | {:.1}% | ETA: ", self.current, self.total, self.percent())?;
        match self.eta_secs {
            Some(eta) => write!(f, "{eta:.1}s")?,
            None => f.write_str("N/A")?,
        }
        f.write_str(" | Elapsed: ")?;
        match self.elapsed_secs {
            Some(elapsed) => write!(f, "{elapsed:.1}s")?,
            None => f.write_str("N/A")?,
        }
        write!(f, " | {}", self.label)
    }
}

/// Elapsed time and ETA tracked together for one stream of observations.
///
/// An observation that follows a completed run, or that moves backwards,
/// begins a new run: both trackers start again from that observation.
#[derive(Debug, Clone, Default)]
pub struct ProgressEstimator {
    timer: ElapsedTimer,
    eta: EtaEstimator,
    current: u64,
    total: u64,
    observed: bool,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, current: u64, total: u64) {
        self.observe_at(Instant::now(), current, total);
    }

    pub fn observe_at(&mut self, now: Instant, current: u64, total: u64) {
        if self.starts_new_run(current, total) {
            tracing::trace!(current, total, "Progress restarted");
            self.reset();
        }
        self.timer.advance_to(now);
        self.timer.observe_at(now, current, total);
        self.eta.observe_at(now, current, total);
        self.current = current;
        self.total = total;
        self.observed = true;
    }

    /// Forget every observation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn starts_new_run(&self, current: u64, total: u64) -> bool {
        if !self.observed {
            return false;
        }
        let finished = self.current == self.total;
        (finished && current != total) || current < self.current
    }

    /// Bring the elapsed timer up to `now` without a new observation.
    pub fn advance_to(&mut self, now: Instant) {
        self.timer.advance_to(now);
    }

    pub fn report(&self, label: impl Into<String>) -> ProgressReport {
        ProgressReport {
            current: self.current,
            total: self.total,
            eta_secs: self.eta.eta_secs(),
            elapsed_secs: self.timer.elapsed_secs(),
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(
        ProgressReport { current: 20, total: 100, eta_secs: Some(8.0), elapsed_secs: Some(2.0), label: "CALCULATING".into() },
        "20 / 100 | 20.0% | ETA: 8.0s | Elapsed: 2.0s | CALCULATING"
    )]
    #[case(
        ProgressReport { current: 0, total: 0, eta_secs: None, elapsed_secs: None, label: "IDLE".into() },
        "0 / 0 | 0.0% | ETA: N/A | Elapsed: N/A | IDLE"
    )]
    #[case(
        ProgressReport { current: 1, total: 3, eta_secs: None, elapsed_secs: Some(0.1), label: "".into() },
        "1 / 3 | 33.3% | ETA: N/A | Elapsed: 0.1s | "
    )]
    fn test_display(#[case] report: ProgressReport, #[case] expected: &str) {
        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn test_estimator_report() {
        let start = Instant::now();
        let mut progress = ProgressEstimator::new();
        progress.observe_at(start, 0, 100);
        progress.observe_at(start + Duration::from_secs(1), 10, 100);
        progress.observe_at(start + Duration::from_secs(2), 20, 100);

        let report = progress.report("CALCULATING");
        assert_eq!(report.current, 20);
        assert_eq!(report.eta_secs, Some(8.0));
        assert_eq!(report.elapsed_secs, Some(2.0));
        assert_eq!(report.to_string(), "20 / 100 | 20.0% | ETA: 8.0s | Elapsed: 2.0s | CALCULATING");
    }

    #[test]
    fn test_new_run_after_completion_starts_fresh() {
        let start = Instant::now();
        let mut progress = ProgressEstimator::new();
        progress.observe_at(start, 0, 12);
        progress.observe_at(start + Duration::from_secs(1), 12, 12);
        assert_eq!(progress.report("").elapsed_secs, Some(1.0));

        // Same total, so only the completed run tells the two apart.
        progress.observe_at(start + Duration::from_secs(2), 0, 12);
        assert_eq!(progress.report("").elapsed_secs, Some(0.0));
        assert_eq!(progress.report("").eta_secs, None);

        progress.observe_at(start + Duration::from_secs(7), 8, 12);
        let report = progress.report("");
        assert_eq!(report.elapsed_secs, Some(5.0));
        assert_eq!(report.eta_secs, Some(2.5));
    }

    #[test]
    fn test_backwards_progress_starts_fresh() {
        let start = Instant::now();
        let mut progress = ProgressEstimator::new();
        progress.observe_at(start, 0, 100);
        progress.observe_at(start + Duration::from_secs(3), 60, 100);
        progress.observe_at(start + Duration::from_secs(4), 0, 40);
        progress.observe_at(start + Duration::from_secs(6), 20, 40);

        let report = progress.report("");
        assert_eq!(report.elapsed_secs, Some(2.0));
        assert_eq!(report.eta_secs, Some(2.0));
    }

    #[test]
    fn test_reset() {
        let start = Instant::now();
        let mut progress = ProgressEstimator::new();
        progress.observe_at(start, 0, 10);
        progress.observe_at(start + Duration::from_secs(1), 5, 10);
        progress.reset();
        assert_eq!(progress.report("IDLE").to_string(), "0 / 0 | 0.0% | ETA: N/A | Elapsed: N/A | IDLE");
    }

    #[test]
    fn test_observer_default_is_noop() {
        struct Counting(std::sync::atomic::AtomicU64);
        impl ProgressObserver for Counting {
            fn on_progress(&self, update: &ProgressUpdate<'_>) {
                self.0.store(update.current, std::sync::atomic::Ordering::Relaxed);
            }
        }
        let update = ProgressUpdate { current: 3, total: 8, label: "CALCULATING" };
        SilentObserver.on_progress(&update);
        let counting = Counting(Default::default());
        counting.on_progress(&update);
        assert_eq!(counting.0.load(std::sync::atomic::Ordering::Relaxed), 3);
    }
}
