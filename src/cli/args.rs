use crate::core::config::ExchangeConfig;
use crate::core::pricing::PricingPolicy;
use clap::Parser;
use std::path::PathBuf;

/// Replay a card exchange operation log through the exchange engine
#[derive(Parser, Debug)]
#[command(name = "card-exchange-engine")]
#[command(about = "Replay a card exchange operation log", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing the operation log
    #[arg(value_name = "INPUT", help = "Path to the input CSV operation log")]
    pub input_file: PathBuf,

    /// Hours until a pending request expires
    #[arg(
        long = "expiration-hours",
        value_name = "HOURS",
        help = "Hours until a pending request expires (default: 72; 0 expires immediately)"
    )]
    pub expiration_hours: Option<i64>,

    /// Seconds between expiration sweep passes
    #[arg(
        long = "sweep-interval-secs",
        value_name = "SECS",
        help = "Seconds between expiration sweep passes (default: 300)"
    )]
    pub sweep_interval_secs: Option<u64>,

    /// Upper bound on the popularity price bonus
    #[arg(
        long = "bonus-cap",
        value_name = "COINS",
        help = "Upper bound on the popularity price bonus (default: 100)"
    )]
    pub bonus_cap: Option<i64>,
}

impl CliArgs {
    /// Create an ExchangeConfig from CLI arguments
    ///
    /// Uses the provided overrides where present and falls back to the
    /// defaults otherwise; invalid values fall back with a warning.
    ///
    /// # Returns
    ///
    /// An `ExchangeConfig` with values from CLI arguments or defaults.
    pub fn to_exchange_config(&self) -> ExchangeConfig {
        let default = ExchangeConfig::default();

        let pricing = PricingPolicy {
            bonus_cap: self.bonus_cap.unwrap_or(default.pricing.bonus_cap),
            ..default.pricing
        };

        ExchangeConfig::new(
            self.expiration_hours.unwrap_or(default.expiration_hours),
            self.sweep_interval_secs
                .unwrap_or(default.sweep_interval_secs),
            pricing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_options(&["program", "input.csv"], None, None, None)]
    #[case::expiration(&["program", "--expiration-hours", "24", "input.csv"], Some(24), None, None)]
    #[case::interval(&["program", "--sweep-interval-secs", "60", "input.csv"], None, Some(60), None)]
    #[case::bonus_cap(&["program", "--bonus-cap", "20", "input.csv"], None, None, Some(20))]
    #[case::all_options(
        &["program", "--expiration-hours", "24", "--sweep-interval-secs", "60", "--bonus-cap", "20", "input.csv"],
        Some(24),
        Some(60),
        Some(20)
    )]
    fn test_option_parsing(
        #[case] args: &[&str],
        #[case] expiration_hours: Option<i64>,
        #[case] sweep_interval_secs: Option<u64>,
        #[case] bonus_cap: Option<i64>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.expiration_hours, expiration_hours);
        assert_eq!(parsed.sweep_interval_secs, sweep_interval_secs);
        assert_eq!(parsed.bonus_cap, bonus_cap);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 72, 300, 100)]
    #[case::custom_expiration(&["program", "--expiration-hours", "24", "input.csv"], 24, 300, 100)]
    #[case::zero_expiration(&["program", "--expiration-hours", "0", "input.csv"], 0, 300, 100)]
    #[case::custom_cap(&["program", "--bonus-cap", "20", "input.csv"], 72, 300, 20)]
    fn test_config_conversion(
        #[case] args: &[&str],
        #[case] expected_hours: i64,
        #[case] expected_interval: u64,
        #[case] expected_cap: i64,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_exchange_config();

        assert_eq!(config.expiration_hours, expected_hours);
        assert_eq!(config.sweep_interval_secs, expected_interval);
        assert_eq!(config.pricing.bonus_cap, expected_cap);
    }

    // Invalid sweep interval falls back to the default
    #[test]
    fn test_zero_interval_falls_back() {
        let parsed =
            CliArgs::try_parse_from(["program", "--sweep-interval-secs", "0", "input.csv"])
                .unwrap();
        let config = parsed.to_exchange_config();
        assert_eq!(config.sweep_interval_secs, 300);
    }

    // Error handling tests
    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::non_numeric_expiration(&["program", "--expiration-hours", "abc", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
