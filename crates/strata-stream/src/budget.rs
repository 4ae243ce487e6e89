use std::time::{Duration, Instant};

/// Wall-clock allowance for one stage of a tick.
///
/// Callers check [`has_time`](Self::has_time) before starting each unit of
/// work, so a stage overruns by at most the unit that was already running.
#[derive(Clone, Copy, Debug)]
pub struct FrameBudget {
    start: Instant,
    limit: Duration,
}

impl FrameBudget {
    /// Starts a budget of `ms` milliseconds now.
    pub fn start_ms(ms: f32) -> Self {
        Self {
            start: Instant::now(),
            limit: Duration::from_secs_f32(ms.max(0.0) / 1000.0),
        }
    }

    /// Returns `true` while time remains.
    pub fn has_time(&self) -> bool {
        self.start.elapsed() < self.limit
    }

    /// Time spent so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The allowance.
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_exhausted() {
        assert!(!FrameBudget::start_ms(0.0).has_time());
    }

    #[test]
    fn test_generous_budget_has_time() {
        let budget = FrameBudget::start_ms(10_000.0);
        assert!(budget.has_time());
        assert_eq!(budget.limit(), Duration::from_secs(10));
    }

    #[test]
    fn test_budget_expires() {
        let budget = FrameBudget::start_ms(1.0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(!budget.has_time());
        assert!(budget.elapsed() >= Duration::from_millis(5));
    }
}
