use std::time::{Duration, Instant};

/// Resolution of the elapsed timer.
pub const TICK: Duration = Duration::from_millis(100);

/// Counts elapsed time in fixed 100 ms ticks.
///
/// The timer starts (or restarts from zero) when it observes a `total` it has
/// not seen before while the work is still incomplete, and stops once
/// `current` reaches `total`. The count only moves through [`tick`](Self::tick)
/// or [`advance_to`](Self::advance_to); callers drive it from their own clock.
#[derive(Debug, Clone, Default)]
pub struct ElapsedTimer {
    ticks: Option<u64>,
    running: bool,
    total: Option<u64>,
    last_tick: Option<Instant>,
}

impl ElapsedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, current: u64, total: u64) {
        self.observe_at(Instant::now(), current, total);
    }

    pub fn observe_at(&mut self, now: Instant, current: u64, total: u64) {
        if self.total != Some(total) && current != total {
            self.total = Some(total);
            self.ticks = Some(0);
            self.running = true;
            self.last_tick = Some(now);
        } else if current == total && self.running {
            self.advance_to(now);
            self.running = false;
        }
    }

    /// Advance by a single tick, if running.
    pub fn tick(&mut self) {
        if self.running {
            self.ticks = Some(self.ticks.unwrap_or(0) + 1);
        }
    }

    /// Apply every whole tick that has passed since the last one.
    pub fn advance_to(&mut self, now: Instant) {
        let Some(last) = self.last_tick.filter(|_| self.running) else {
            return;
        };
        let whole = now.saturating_duration_since(last).as_millis() / TICK.as_millis();
        let whole = u32::try_from(whole).unwrap_or(u32::MAX);
        if whole > 0 {
            self.ticks = Some(self.ticks.unwrap_or(0) + u64::from(whole));
            self.last_tick = Some(last + TICK * whole);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Elapsed seconds at 0.1 s resolution, or `None` if the timer never started.
    pub fn elapsed_secs(&self) -> Option<f64> {
        // Lossless for any realistic tick count.
        self.ticks.map(|t| t as f64 / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_started() {
        let mut timer = ElapsedTimer::new();
        assert_eq!(timer.elapsed_secs(), None);
        timer.tick();
        assert_eq!(timer.elapsed_secs(), None);
    }

    #[test]
    fn test_ticks_while_running() {
        let mut timer = ElapsedTimer::new();
        timer.observe(0, 10);
        for _ in 0..15 {
            timer.tick();
        }
        assert_eq!(timer.elapsed_secs(), Some(1.5));
    }

    #[test]
    fn test_restarts_when_total_changes() {
        let start = Instant::now();
        let mut timer = ElapsedTimer::new();
        timer.observe_at(start, 0, 10);
        timer.advance_to(start + Duration::from_millis(2_050));
        assert_eq!(timer.elapsed_secs(), Some(2.0));

        // Same total: keeps counting.
        timer.observe_at(start + Duration::from_millis(2_100), 4, 10);
        timer.advance_to(start + Duration::from_millis(2_100));
        assert_eq!(timer.elapsed_secs(), Some(2.1));

        // New total while incomplete: back to zero.
        timer.observe_at(start + Duration::from_millis(2_100), 4, 20);
        assert_eq!(timer.elapsed_secs(), Some(0.0));
        timer.advance_to(start + Duration::from_millis(2_400));
        assert_eq!(timer.elapsed_secs(), Some(0.3));
    }

    #[test]
    fn test_stops_when_complete() {
        let start = Instant::now();
        let mut timer = ElapsedTimer::new();
        timer.observe_at(start, 0, 10);
        timer.observe_at(start + Duration::from_millis(700), 10, 10);
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_secs(), Some(0.7));

        timer.tick();
        timer.advance_to(start + Duration::from_secs(60));
        assert_eq!(timer.elapsed_secs(), Some(0.7));
    }

    #[test]
    fn test_already_complete_never_starts() {
        let mut timer = ElapsedTimer::new();
        timer.observe(5, 5);
        assert_eq!(timer.elapsed_secs(), None);
    }
}
