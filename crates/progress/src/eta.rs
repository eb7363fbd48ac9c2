use std::collections::VecDeque;
use std::time::Instant;

/// Number of intervals between observations the estimate is computed over.
pub const WINDOW: usize = 10;

/// A single `(current, total)` observation and when it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub at: Instant,
    pub current: u64,
    pub total: u64,
}

/// Estimates time remaining from the pace of recent progress.
///
/// Each interval between two adjacent observations yields a time-per-unit
/// figure. The estimate is a weighted average over the most recent
/// [`WINDOW`] intervals, where the newest interval weighs `n` and the oldest
/// weighs `1`, multiplied by the work remaining.
///
/// Intervals in which no work completed carry no pace information and are
/// skipped; the weights are normalized over the intervals actually used.
#[derive(Debug, Clone, Default)]
pub struct EtaEstimator {
    samples: VecDeque<ProgressSample>,
    total: Option<u64>,
    eta: Option<f64>,
}

impl EtaEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, current: u64, total: u64) {
        self.observe_at(Instant::now(), current, total);
    }

    pub fn observe_at(&mut self, at: Instant, current: u64, total: u64) {
        let sample = ProgressSample { at, current, total };
        if self.total != Some(total) && current == 0 {
            self.total = Some(total);
            self.samples.clear();
            self.samples.push_back(sample);
            self.eta = None;
            return;
        }
        if current == total || current == 0 {
            self.eta = None;
            return;
        }
        self.samples.push_back(sample);
        while self.samples.len() > WINDOW + 1 {
            self.samples.pop_front();
        }
        self.eta = self.estimate(total - current);
    }

    /// Seconds remaining at 0.1 s resolution, if there is enough history.
    pub fn eta_secs(&self) -> Option<f64> {
        self.eta
    }

    fn estimate(&self, remaining: u64) -> Option<f64> {
        let pairs: Vec<(f64, f64)> = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(prev, next)| {
                // Signed: a caller may report progress going backwards.
                let work = next.current as f64 - prev.current as f64;
                let millis = next.at.saturating_duration_since(prev.at).as_secs_f64() * 1000.0;
                (work, millis)
            })
            .collect();
        let len = pairs.len();

        let (weighted, weights) = pairs
            .iter()
            .rev()
            .take(WINDOW)
            .enumerate()
            .filter(|(_, (work, _))| *work > 0.0)
            .fold((0.0, 0.0), |(weighted, weights), (index, (work, millis))| {
                let weight = (len.min(WINDOW) - index) as f64;
                (weighted + (millis / work) * weight, weights + weight)
            });
        if weights == 0.0 {
            return None;
        }

        let millis_per_unit = weighted / weights;
        let remaining_secs = remaining as f64 * millis_per_unit / 1000.0;
        Some((remaining_secs * 10.0).round() / 10.0)
    }
}
