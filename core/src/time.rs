use std::{
    ops::Add,
    time::{Duration, Instant},
};

/// Monotonic point in time measured from the session epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The session epoch.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Creates a timestamp located `offset` after the epoch.
    #[must_use]
    pub const fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Creates a timestamp from fractional seconds; negative or non-finite input maps to the epoch.
    #[must_use]
    pub fn from_secs_f64(seconds: f64) -> Self {
        Self(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO))
    }

    /// Offset from the epoch in fractional seconds.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed since `earlier`, or zero when `earlier` lies in the future.
    #[must_use]
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Moves the timestamp back by `offset`, stopping at the epoch.
    #[must_use]
    pub fn saturating_sub(&self, offset: Duration) -> Timestamp {
        Self(self.0.saturating_sub(offset))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// Source of wall-clock timestamps.
pub trait Clock {
    /// Current time relative to the clock's epoch.
    fn now(&self) -> Timestamp;
}

/// Clock backed by [`Instant`], with its epoch at construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Starts a new clock whose epoch is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.epoch.elapsed())
    }
}

/// Clock that only moves when told to, used for replays and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualClock {
    now: Timestamp,
}

impl ManualClock {
    /// Creates a clock positioned at the epoch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Timestamp::ZERO,
        }
    }

    /// Advances the clock by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now + dt;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_seconds_clamp_to_epoch() {
        assert_eq!(Timestamp::from_secs_f64(-3.0), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::ZERO);
    }

    #[test]
    fn duration_since_saturates_for_future_timestamps() {
        let earlier = Timestamp::from_secs_f64(2.0);
        let later = Timestamp::from_secs_f64(5.0);

        assert_eq!(later.saturating_duration_since(earlier), Duration::from_secs(3));
        assert_eq!(earlier.saturating_duration_since(later), Duration::ZERO);
    }

    #[test]
    fn system_clock_never_runs_backwards() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();

        assert!(second >= first);
    }

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let mut clock = ManualClock::new();
        assert_eq!(clock.now(), Timestamp::ZERO);

        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Timestamp::from_duration(Duration::from_millis(500)));
        assert_eq!(clock.now(), clock.now());
    }
}
