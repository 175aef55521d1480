use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use std::time::Duration;

use crate::error::AraneidError;

/// A signed duration stored as nanoseconds.
///
/// Arithmetic never overflows silently in normal simulation use (durations
/// stay well inside `i64` range for any plausible simulated run), but the
/// representation is exact down to a nanosecond, matching the original
/// `std::chrono::nanoseconds`-backed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeDelta {
    nanos: i64,
}

impl TimeDelta {
    pub const fn zero() -> Self {
        TimeDelta { nanos: 0 }
    }

    pub const fn nanos(n: i64) -> Self {
        TimeDelta { nanos: n }
    }

    pub const fn micros(n: i64) -> Self {
        TimeDelta { nanos: n * 1_000 }
    }

    pub const fn millis(n: i64) -> Self {
        TimeDelta { nanos: n * 1_000_000 }
    }

    pub const fn seconds(n: i64) -> Self {
        TimeDelta { nanos: n * 1_000_000_000 }
    }

    pub const fn minutes(n: i64) -> Self {
        TimeDelta { nanos: n * 60_000_000_000 }
    }

    pub const fn hours(n: i64) -> Self {
        TimeDelta { nanos: n * 3_600_000_000_000 }
    }

    pub const fn as_nanos(self) -> i64 {
        self.nanos
    }

    pub const fn as_micros(self) -> i64 {
        self.nanos / 1_000
    }

    pub const fn as_millis(self) -> i64 {
        self.nanos / 1_000_000
    }

    pub const fn as_seconds(self) -> i64 {
        self.nanos / 1_000_000_000
    }

    pub const fn as_minutes(self) -> i64 {
        self.nanos / 60_000_000_000
    }

    pub const fn as_hours(self) -> i64 {
        self.nanos / 3_600_000_000_000
    }

    pub const fn is_zero(self) -> bool {
        self.nanos == 0
    }

    /// Lossy conversion to `std::time::Duration` for sleeping/`wait_until`.
    /// Negative deltas clamp to zero — the scheduler never needs to wait a
    /// negative amount, and clamping here keeps call sites simple.
    pub fn to_std(self) -> Duration {
        if self.nanos <= 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.nanos as u64)
        }
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;
    fn add(self, rhs: Self) -> Self::Output {
        TimeDelta { nanos: self.nanos + rhs.nanos }
    }
}

impl Sub for TimeDelta {
    type Output = TimeDelta;
    fn sub(self, rhs: Self) -> Self::Output {
        TimeDelta { nanos: self.nanos - rhs.nanos }
    }
}

impl AddAssign for TimeDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.nanos += rhs.nanos;
    }
}

impl SubAssign for TimeDelta {
    fn sub_assign(&mut self, rhs: Self) {
        self.nanos -= rhs.nanos;
    }
}

impl fmt::Display for TimeDelta {
    /// Renders the largest non-zero unit, matching the original's
    /// preference order h > m > s > ms > us > ns.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return write!(f, "0s");
        }
        let abs = self.nanos.unsigned_abs();
        let sign = if self.nanos < 0 { "-" } else { "" };
        if abs % 3_600_000_000_000 == 0 {
            write!(f, "{sign}{}h", abs / 3_600_000_000_000)
        } else if abs % 60_000_000_000 == 0 {
            write!(f, "{sign}{}m", abs / 60_000_000_000)
        } else if abs % 1_000_000_000 == 0 {
            write!(f, "{sign}{}s", abs / 1_000_000_000)
        } else if abs % 1_000_000 == 0 {
            write!(f, "{sign}{}ms", abs / 1_000_000)
        } else if abs % 1_000 == 0 {
            write!(f, "{sign}{}us", abs / 1_000)
        } else {
            write!(f, "{sign}{}ns", abs)
        }
    }
}

impl FromStr for TimeDelta {
    type Err = AraneidError;

    /// Parses strings like `"1h2m3s4ms"` or `"500us"`, the same grammar the
    /// original's `TimeDelta(std::string)` constructor accepted: a run of
    /// digits followed by one unit suffix, repeated, with component values
    /// additive across repeats of the same unit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total = TimeDelta::zero();
        let bytes = s.as_bytes();
        let mut i = 0;
        if s.is_empty() {
            return Err(AraneidError::Configuration("empty time string".into()));
        }
        while i < bytes.len() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if start == i {
                return Err(AraneidError::Configuration(format!(
                    "invalid time format: {s}"
                )));
            }
            let value: i64 = s[start..i].parse().map_err(|_| {
                AraneidError::Configuration(format!("invalid time value in: {s}"))
            })?;
            if i < bytes.len() && bytes[i] == b'u' && bytes.get(i + 1) == Some(&b's') {
                total += TimeDelta::micros(value);
                i += 2;
            } else if i < bytes.len() && bytes[i] == b'm' && bytes.get(i + 1) == Some(&b's') {
                total += TimeDelta::millis(value);
                i += 2;
            } else if i < bytes.len() && bytes[i] == b'h' {
                total += TimeDelta::hours(value);
                i += 1;
            } else if i < bytes.len() && bytes[i] == b'm' {
                total += TimeDelta::minutes(value);
                i += 1;
            } else if i < bytes.len() && bytes[i] == b's' {
                total += TimeDelta::seconds(value);
                i += 1;
            } else {
                return Err(AraneidError::Configuration(format!(
                    "invalid time unit in: {s}"
                )));
            }
        }
        Ok(total)
    }
}
