use std::time::{Duration, Instant};

/// Debounce guard between refresh cycles.
///
/// A timer tick may start a new cycle only if at least
/// `interval - guard` has passed since the previous cycle *began*. This
/// thins out ticks that land too close to a manual refresh; it does not
/// make cycles mutually exclusive.
#[derive(Debug, Clone)]
pub struct RefreshGuard {
    min_gap: Duration,
    last_started: Option<Instant>,
}

impl RefreshGuard {
    pub fn new(interval: Duration, guard: Duration) -> Self {
        Self {
            min_gap: interval.saturating_sub(guard),
            last_started: None,
        }
    }

    /// Minimum time between cycle starts for a tick to be admitted.
    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    pub fn last_started(&self) -> Option<Instant> {
        self.last_started
    }

    pub fn should_run(&self, now: Instant) -> bool {
        match self.last_started {
            None => true,
            Some(started) => now.saturating_duration_since(started) >= self.min_gap,
        }
    }

    pub fn mark_started(&mut self, now: Instant) {
        self.last_started = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_always_runs() {
        let guard = RefreshGuard::new(Duration::from_secs(15), Duration::from_secs(1));
        assert!(guard.should_run(Instant::now()));
    }

    #[test]
    fn tick_inside_gap_is_suppressed() {
        let mut guard = RefreshGuard::new(Duration::from_secs(15), Duration::from_secs(1));
        let t0 = Instant::now();
        guard.mark_started(t0);
        assert!(!guard.should_run(t0 + Duration::from_millis(13_999)));
        assert!(guard.should_run(t0 + Duration::from_secs(14)));
        assert!(guard.should_run(t0 + Duration::from_secs(15)));
    }

    #[test]
    fn guard_larger_than_interval_never_blocks() {
        let mut guard = RefreshGuard::new(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(guard.min_gap(), Duration::ZERO);
        let t0 = Instant::now();
        guard.mark_started(t0);
        assert!(guard.should_run(t0));
    }
}
