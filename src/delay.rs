// ABOUTME: Pluggable sources for think and use durations.
// ABOUTME: Random (optionally seeded) for real runs, fixed for deterministic tests.

use std::ops::RangeInclusive;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::AgentId;

/// Supplies how long an agent thinks and how long it uses its tokens.
///
/// Implementations are shared by every agent in a run, so they must be
/// safe to call concurrently.
pub trait DelaySource: Send + Sync {
    /// Pause before the next acquisition attempt.
    fn think_duration(&self, agent: AgentId) -> Duration;

    /// Time spent holding both tokens.
    fn use_duration(&self, agent: AgentId) -> Duration;
}

/// Uniformly random durations drawn from millisecond ranges.
pub struct RandomDelay {
    think_ms: RangeInclusive<u64>,
    use_ms: RangeInclusive<u64>,
    rng: Mutex<StdRng>,
}

impl RandomDelay {
    /// Create a random delay source.
    ///
    /// With `seed` set, the sequence of draws is reproducible. Note that
    /// which agent receives which draw still depends on scheduling.
    ///
    /// # Panics
    ///
    /// Panics if either range is empty (`start > end`).
    pub fn new(
        think_ms: RangeInclusive<u64>,
        use_ms: RangeInclusive<u64>,
        seed: Option<u64>,
    ) -> Self {
        assert!(!think_ms.is_empty(), "think range must not be empty");
        assert!(!use_ms.is_empty(), "use range must not be empty");

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            think_ms,
            use_ms,
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self, range: &RangeInclusive<u64>) -> Duration {
        let ms = self.rng.lock().random_range(range.clone());
        Duration::from_millis(ms)
    }
}

impl DelaySource for RandomDelay {
    fn think_duration(&self, _agent: AgentId) -> Duration {
        self.draw(&self.think_ms)
    }

    fn use_duration(&self, _agent: AgentId) -> Duration {
        self.draw(&self.use_ms)
    }
}

/// The same durations for every agent, every time.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay {
    pub think: Duration,
    pub hold: Duration,
}

impl FixedDelay {
    pub fn new(think: Duration, hold: Duration) -> Self {
        Self { think, hold }
    }

    /// No pauses at all. Maximizes contention.
    pub fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl DelaySource for FixedDelay {
    fn think_duration(&self, _agent: AgentId) -> Duration {
        self.think
    }

    fn use_duration(&self, _agent: AgentId) -> Duration {
        self.hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_delay_stays_in_range() {
        let delays = RandomDelay::new(10..=20, 30..=40, None);
        for i in 0..200 {
            let think = delays.think_duration(AgentId(i % 5));
            let hold = delays.use_duration(AgentId(i % 5));
            assert!(think >= Duration::from_millis(10) && think <= Duration::from_millis(20));
            assert!(hold >= Duration::from_millis(30) && hold <= Duration::from_millis(40));
        }
    }

    #[test]
    fn test_seeded_delay_is_reproducible() {
        let a = RandomDelay::new(0..=1000, 0..=1000, Some(42));
        let b = RandomDelay::new(0..=1000, 0..=1000, Some(42));

        let draws_a: Vec<_> = (0..20).map(|_| a.think_duration(AgentId(0))).collect();
        let draws_b: Vec<_> = (0..20).map(|_| b.think_duration(AgentId(0))).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let delays = RandomDelay::new(7..=7, 0..=0, None);
        assert_eq!(delays.think_duration(AgentId(0)), Duration::from_millis(7));
        assert_eq!(delays.use_duration(AgentId(0)), Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "think range")]
    fn test_empty_range_panics() {
        #[allow(clippy::reversed_empty_ranges)]
        let _ = RandomDelay::new(5..=1, 0..=1, None);
    }

    #[test]
    fn test_fixed_delay() {
        let delays = FixedDelay::new(Duration::from_millis(3), Duration::from_millis(4));
        assert_eq!(delays.think_duration(AgentId(9)), Duration::from_millis(3));
        assert_eq!(delays.use_duration(AgentId(9)), Duration::from_millis(4));

        let zero = FixedDelay::zero();
        assert_eq!(zero.think_duration(AgentId(0)), Duration::ZERO);
    }
}
