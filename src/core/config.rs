//! Engine configuration
//!
//! Bundles the tunable policies of the exchange engine: the expiration
//! window for pending requests, the sweep cadence of the background
//! expiration task, and the pricing policy.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::core::pricing::PricingPolicy;

/// Default expiration window for pending requests (72 hours)
pub const DEFAULT_EXPIRATION_HOURS: i64 = 72;

/// Default interval between expiration sweeps (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Configuration for the exchange engine
///
/// The defaults match the production service: a 72-hour request window
/// swept every five minutes, with the standard pricing curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Hours until a pending request is due for expiration
    ///
    /// Zero is valid and makes requests expire immediately; useful for
    /// exercising the expiration paths deterministically.
    pub expiration_hours: i64,

    /// Seconds between expiration sweep passes
    pub sweep_interval_secs: u64,

    /// Pricing policy applied at request creation
    pub pricing: PricingPolicy,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            expiration_hours: DEFAULT_EXPIRATION_HOURS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            pricing: PricingPolicy::default(),
        }
    }
}

impl ExchangeConfig {
    /// Create a new ExchangeConfig with custom values
    ///
    /// Invalid values fall back to defaults with a warning: a negative
    /// expiration window and a zero sweep interval are both rejected.
    pub fn new(expiration_hours: i64, sweep_interval_secs: u64, pricing: PricingPolicy) -> Self {
        let default = Self::default();

        let expiration_hours = if expiration_hours < 0 {
            tracing::warn!(
                expiration_hours,
                default = default.expiration_hours,
                "Invalid expiration_hours, using default"
            );
            default.expiration_hours
        } else {
            expiration_hours
        };

        let sweep_interval_secs = if sweep_interval_secs == 0 {
            tracing::warn!(
                sweep_interval_secs,
                default = default.sweep_interval_secs,
                "Invalid sweep_interval_secs, using default"
            );
            default.sweep_interval_secs
        } else {
            sweep_interval_secs
        };

        Self {
            expiration_hours,
            sweep_interval_secs,
            pricing,
        }
    }

    /// The expiration window as a chrono duration
    pub fn expiration(&self) -> Duration {
        Duration::hours(self.expiration_hours)
    }

    /// The sweep interval as a std duration
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.expiration_hours, 72);
        assert_eq!(config.sweep_interval_secs, 300);
        assert_eq!(config.expiration(), Duration::hours(72));
        assert_eq!(
            config.sweep_interval(),
            std::time::Duration::from_secs(300)
        );
    }

    #[rstest]
    #[case::custom(24, 60, 24, 60)]
    #[case::zero_expiration_is_valid(0, 60, 0, 60)]
    #[case::negative_expiration_falls_back(-1, 60, 72, 60)]
    #[case::zero_interval_falls_back(24, 0, 24, 300)]
    fn test_new_validates(
        #[case] hours: i64,
        #[case] interval: u64,
        #[case] expected_hours: i64,
        #[case] expected_interval: u64,
    ) {
        let config = ExchangeConfig::new(hours, interval, PricingPolicy::default());
        assert_eq!(config.expiration_hours, expected_hours);
        assert_eq!(config.sweep_interval_secs, expected_interval);
    }
}
