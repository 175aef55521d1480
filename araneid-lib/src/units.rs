use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

use crate::error::AraneidError;
use crate::time::TimeDelta;

/// An amount of data, stored as an exact bit count.
///
/// Byte-oriented APIs (packet payload lengths, buffer capacities) round to
/// whole bytes; bit-oriented ones (bandwidth math) keep the extra
/// precision, mirroring how the original kept a single bit-count
/// representation under both the byte- and bit-facing accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DataSize {
    bits: u64,
}

impl DataSize {
    pub const fn zero() -> Self {
        DataSize { bits: 0 }
    }

    pub const fn from_bits(bits: u64) -> Self {
        DataSize { bits }
    }

    pub const fn from_bytes(bytes: u64) -> Self {
        DataSize { bits: bytes * 8 }
    }

    pub const fn as_bits(self) -> u64 {
        self.bits
    }

    pub const fn as_bytes(self) -> u64 {
        self.bits / 8
    }

    pub fn saturating_add(self, rhs: DataSize) -> DataSize {
        DataSize { bits: self.bits.saturating_add(rhs.bits) }
    }

    pub fn saturating_sub(self, rhs: DataSize) -> DataSize {
        DataSize { bits: self.bits.saturating_sub(rhs.bits) }
    }

    /// How long it takes to move this much data at a given rate.
    pub fn duration_at(self, rate: DataRate) -> TimeDelta {
        if rate.bps <= 0.0 {
            return TimeDelta::zero();
        }
        let seconds = self.bits as f64 / rate.bps;
        TimeDelta::nanos((seconds * 1e9) as i64)
    }
}

/// `size / delay` is the rate that would move `size` over `delay` — the
/// inverse of `duration_at`, used when a link's configured delay and a
/// packet's size are known but its rate isn't.
impl Div<TimeDelta> for DataSize {
    type Output = DataRate;
    fn div(self, rhs: TimeDelta) -> DataRate {
        let seconds = rhs.as_nanos() as f64 / 1e9;
        if seconds <= 0.0 {
            return DataRate::zero();
        }
        DataRate::from_bps(self.bits as f64 / seconds)
    }
}

impl Div<DataRate> for DataSize {
    type Output = TimeDelta;
    fn div(self, rhs: DataRate) -> TimeDelta {
        self.duration_at(rhs)
    }
}

impl Add for DataSize {
    type Output = DataSize;
    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub for DataSize {
    type Output = DataSize;
    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl AddAssign for DataSize {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for DataSize {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for DataSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(&str, u64); 4] = [("GiB", 1 << 30), ("MiB", 1 << 20), ("KiB", 1 << 10), ("B", 1)];
        let bytes = self.as_bytes();
        for (suffix, scale) in UNITS {
            if bytes >= scale && bytes % scale == 0 {
                return write!(f, "{}{suffix}", bytes / scale);
            }
        }
        write!(f, "{bytes}B")
    }
}

impl FromStr for DataSize {
    type Err = AraneidError;

    /// Parses `"1500B"`, `"64KiB"`, `"2MiB"`, `"1GiB"` — the size notation
    /// used in link configuration for buffer capacities.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, suffix) = split_leading_digits(s)
            .ok_or_else(|| AraneidError::Configuration(format!("invalid data size: {s}")))?;
        let value: u64 = digits
            .parse()
            .map_err(|_| AraneidError::Configuration(format!("invalid data size value: {s}")))?;
        let scale: u64 = match suffix {
            "B" | "" => 1,
            "KiB" => 1 << 10,
            "MiB" => 1 << 20,
            "GiB" => 1 << 30,
            other => {
                return Err(AraneidError::Configuration(format!("unknown size unit: {other}")))
            }
        };
        Ok(DataSize::from_bytes(value * scale))
    }
}

/// A transfer rate, stored in bits per second.
///
/// Kept as `f64` rather than an integer because the original's bandwidth
/// limiter divides packet sizes by rate to get a wait duration, and that
/// division is inherently fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRate {
    bps: f64,
}

impl DataRate {
    pub const fn zero() -> Self {
        DataRate { bps: 0.0 }
    }

    pub const fn from_bps(bps: f64) -> Self {
        DataRate { bps }
    }

    pub const fn from_kbps(kbps: f64) -> Self {
        DataRate { bps: kbps * 1_000.0 }
    }

    pub const fn from_mbps(mbps: f64) -> Self {
        DataRate { bps: mbps * 1_000_000.0 }
    }

    pub const fn from_gbps(gbps: f64) -> Self {
        DataRate { bps: gbps * 1_000_000_000.0 }
    }

    pub const fn as_bps(self) -> f64 {
        self.bps
    }
}

/// `rate * delay` is how much data crosses the link in that time.
impl Mul<TimeDelta> for DataRate {
    type Output = DataSize;
    fn mul(self, rhs: TimeDelta) -> DataSize {
        let seconds = rhs.as_nanos() as f64 / 1e9;
        DataSize::from_bits((self.bps * seconds).max(0.0) as u64)
    }
}

impl Mul<DataRate> for TimeDelta {
    type Output = DataSize;
    fn mul(self, rhs: DataRate) -> DataSize {
        rhs * self
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bps >= 1e9 {
            write!(f, "{}Gbps", self.bps / 1e9)
        } else if self.bps >= 1e6 {
            write!(f, "{}Mbps", self.bps / 1e6)
        } else if self.bps >= 1e3 {
            write!(f, "{}Kbps", self.bps / 1e3)
        } else {
            write!(f, "{}bps", self.bps)
        }
    }
}

impl FromStr for DataRate {
    type Err = AraneidError;

    /// Parses `"10Mbps"`, `"1Gbps"`, `"500Kbps"`, `"bps"`-suffixed link
    /// bandwidth values from configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, suffix) = split_leading_digits(s)
            .ok_or_else(|| AraneidError::Configuration(format!("invalid data rate: {s}")))?;
        let value: f64 = digits
            .parse()
            .map_err(|_| AraneidError::Configuration(format!("invalid data rate value: {s}")))?;
        match suffix {
            "bps" => Ok(DataRate::from_bps(value)),
            "Kbps" => Ok(DataRate::from_kbps(value)),
            "Mbps" => Ok(DataRate::from_mbps(value)),
            "Gbps" => Ok(DataRate::from_gbps(value)),
            other => Err(AraneidError::Configuration(format!("unknown rate unit: {other}"))),
        }
    }
}

fn split_leading_digits(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_byte_sizes() {
        assert_eq!("1500B".parse::<DataSize>().unwrap(), DataSize::from_bytes(1500));
        assert_eq!("64KiB".parse::<DataSize>().unwrap(), DataSize::from_bytes(64 * 1024));
        assert_eq!("1MiB".parse::<DataSize>().unwrap(), DataSize::from_bytes(1024 * 1024));
    }

    #[test]
    fn parses_rates() {
        assert_eq!("10Mbps".parse::<DataRate>().unwrap(), DataRate::from_mbps(10.0));
        assert_eq!("1Gbps".parse::<DataRate>().unwrap(), DataRate::from_gbps(1.0));
    }

    #[test]
    fn duration_at_rate_matches_expectation() {
        let size = DataSize::from_bytes(125_000);
        let rate = DataRate::from_mbps(1.0);
        assert_eq!(size.duration_at(rate), TimeDelta::seconds(1));
    }

    #[test]
    fn zero_rate_yields_zero_duration() {
        let size = DataSize::from_bytes(100);
        assert_eq!(size.duration_at(DataRate::zero()), TimeDelta::zero());
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let a = DataSize::from_bytes(10);
        let b = DataSize::from_bytes(20);
        assert_eq!(a - b, DataSize::zero());
    }

    #[test]
    fn size_over_delay_yields_rate() {
        let size = DataSize::from_bytes(125_000);
        let rate = size / TimeDelta::seconds(1);
        assert_eq!(rate.as_bps(), 1_000_000.0);
    }

    #[test]
    fn rate_times_delay_yields_size() {
        let rate = DataRate::from_mbps(1.0);
        let size = rate * TimeDelta::seconds(1);
        assert_eq!(size, DataSize::from_bytes(125_000));
    }

    #[test]
    fn size_over_zero_delay_yields_zero_rate() {
        let size = DataSize::from_bytes(100);
        assert_eq!((size / TimeDelta::zero()).as_bps(), 0.0);
    }
}
