use rand::Rng;

use crate::error::{AraneidError, Result};

/// A pluggable decision point for whether a packet survives transmission.
///
/// Implemented as a trait rather than a single built-in policy so that
/// link configuration can later select among loss models without the
/// transmission state machine knowing which one is in effect.
pub trait PacketLoss: Send + Sync {
    fn should_drop(&self) -> bool;
}

/// Drops packets independently with fixed probability `rate`, matching the
/// original's uniform-random loss model.
pub struct RandomPacketLoss {
    rate: f64,
}

impl RandomPacketLoss {
    /// A rate outside `[0.0, 1.0]` is a misconfiguration, not something to
    /// silently coerce into range, so construction fails rather than
    /// clamping.
    pub fn new(rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(AraneidError::Configuration(format!(
                "packet loss rate must be within [0, 1], got {rate}"
            )));
        }
        Ok(RandomPacketLoss { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl PacketLoss for RandomPacketLoss {
    fn should_drop(&self) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        if self.rate >= 1.0 {
            return true;
        }
        rand::rng().random_bool(self.rate)
    }
}

/// Never drops a packet. Used when a link's configuration omits a loss
/// rate entirely.
pub struct NoPacketLoss;

impl PacketLoss for NoPacketLoss {
    fn should_drop(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_never_drops() {
        let loss = RandomPacketLoss::new(0.0).unwrap();
        for _ in 0..1000 {
            assert!(!loss.should_drop());
        }
    }

    #[test]
    fn full_rate_always_drops() {
        let loss = RandomPacketLoss::new(1.0).unwrap();
        for _ in 0..1000 {
            assert!(loss.should_drop());
        }
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        assert!(RandomPacketLoss::new(5.0).is_err());
        assert!(RandomPacketLoss::new(-1.0).is_err());
    }
}
