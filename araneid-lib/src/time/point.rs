use std::fmt;
use std::ops::{Add, Sub};
use std::sync::OnceLock;
use std::time::Instant;

use super::delta::TimeDelta;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

/// A point on the simulation's virtual timeline, measured in nanoseconds
/// since the process-wide epoch (the instant the scheduler module was first
/// touched).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint {
    nanos_since_epoch: i64,
}

impl TimePoint {
    pub const fn zero() -> Self {
        TimePoint { nanos_since_epoch: 0 }
    }

    /// The current wall-clock instant expressed as a `TimePoint`, anchored
    /// to the shared epoch so every `TimePoint` in the process is
    /// comparable regardless of where it was constructed.
    pub fn now() -> Self {
        let elapsed = Instant::now().duration_since(epoch());
        TimePoint { nanos_since_epoch: elapsed.as_nanos() as i64 }
    }

    pub const fn since_epoch(self) -> TimeDelta {
        TimeDelta::nanos(self.nanos_since_epoch)
    }

    pub fn duration_since(self, earlier: TimePoint) -> TimeDelta {
        TimeDelta::nanos(self.nanos_since_epoch - earlier.nanos_since_epoch)
    }
}

impl Add<TimeDelta> for TimePoint {
    type Output = TimePoint;
    fn add(self, rhs: TimeDelta) -> Self::Output {
        TimePoint { nanos_since_epoch: self.nanos_since_epoch + rhs.as_nanos() }
    }
}

impl Sub<TimeDelta> for TimePoint {
    type Output = TimePoint;
    fn sub(self, rhs: TimeDelta) -> Self::Output {
        TimePoint { nanos_since_epoch: self.nanos_since_epoch - rhs.as_nanos() }
    }
}

impl Sub<TimePoint> for TimePoint {
    type Output = TimeDelta;
    fn sub(self, rhs: TimePoint) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}", self.since_epoch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let a = TimePoint::now();
        let b = TimePoint::now();
        assert!(b >= a);
    }

    #[test]
    fn arithmetic_matches_delta() {
        let a = TimePoint::zero();
        let b = a + TimeDelta::seconds(5);
        assert_eq!(b.since_epoch(), TimeDelta::seconds(5));
        assert_eq!(b - a, TimeDelta::seconds(5));
    }
}
