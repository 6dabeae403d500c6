//! Exchange price calculation
//!
//! Derives the price of a card from its base price and a popularity signal.
//! The bonus curve is policy, not contract: the divisor, weight, and cap are
//! all configurable, with the standard curve as default. The function is
//! pure and has no failure modes; non-positive base prices are rejected at
//! catalog registration, before pricing is ever reached.

use serde::{Deserialize, Serialize};

use crate::types::{CardId, CardInfo, CoinAmount};

/// Pricing policy for exchange requests
///
/// `price = base_price + min(bonus_cap, likes / like_divisor +
/// exchanges * exchange_weight)`. The bonus is monotonically non-decreasing
/// in both popularity counters and bounded by `bonus_cap` to prevent
/// runaway pricing on viral cards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Likes needed per bonus coin
    pub like_divisor: u32,

    /// Bonus coins per completed exchange
    pub exchange_weight: u32,

    /// Upper bound on the popularity bonus
    pub bonus_cap: CoinAmount,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        // One bonus coin per 10 likes, two per completed exchange
        Self {
            like_divisor: 10,
            exchange_weight: 2,
            bonus_cap: 100,
        }
    }
}

impl PricingPolicy {
    /// Compute the popularity bonus for the given counters
    pub fn popularity_bonus(&self, like_count: u32, exchange_count: u32) -> CoinAmount {
        let divisor = self.like_divisor.max(1);
        let bonus = (like_count / divisor) as CoinAmount
            + (exchange_count as CoinAmount) * self.exchange_weight as CoinAmount;
        bonus.min(self.bonus_cap)
    }

    /// Compute the exchange price for a card
    pub fn price(&self, card: &CardInfo) -> CoinAmount {
        card.base_price + self.popularity_bonus(card.like_count, card.exchange_count)
    }

    /// Compute a price breakdown for display to the requester
    pub fn quote(&self, card: &CardInfo) -> PriceQuote {
        let popularity_bonus = self.popularity_bonus(card.like_count, card.exchange_count);
        PriceQuote {
            card_id: card.id,
            base_price: card.base_price,
            popularity_bonus,
            final_price: card.base_price + popularity_bonus,
        }
    }
}

/// Price breakdown for a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub card_id: CardId,
    pub base_price: CoinAmount,
    pub popularity_bonus: CoinAmount,
    pub final_price: CoinAmount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn card(base_price: CoinAmount, like_count: u32, exchange_count: u32) -> CardInfo {
        CardInfo {
            id: 1,
            owner_id: 2,
            base_price,
            like_count,
            exchange_count,
        }
    }

    #[rstest]
    #[case::no_popularity(10, 0, 0, 10)]
    #[case::likes_only(10, 25, 0, 12)]
    #[case::exchanges_only(10, 0, 5, 20)]
    #[case::likes_and_exchanges(10, 50, 3, 21)]
    #[case::likes_below_divisor(10, 9, 0, 10)]
    fn test_default_curve(
        #[case] base: CoinAmount,
        #[case] likes: u32,
        #[case] exchanges: u32,
        #[case] expected: CoinAmount,
    ) {
        let policy = PricingPolicy::default();
        assert_eq!(policy.price(&card(base, likes, exchanges)), expected);
    }

    #[test]
    fn test_bonus_is_capped() {
        let policy = PricingPolicy {
            like_divisor: 10,
            exchange_weight: 2,
            bonus_cap: 15,
        };
        assert_eq!(policy.popularity_bonus(1000, 50), 15);
        assert_eq!(policy.price(&card(10, 1000, 50)), 25);
    }

    #[test]
    fn test_bonus_is_monotonic() {
        let policy = PricingPolicy::default();
        let mut last = 0;
        for likes in (0..200).step_by(7) {
            let bonus = policy.popularity_bonus(likes, 0);
            assert!(bonus >= last);
            last = bonus;
        }
        let mut last = 0;
        for exchanges in 0..50 {
            let bonus = policy.popularity_bonus(0, exchanges);
            assert!(bonus >= last);
            last = bonus;
        }
    }

    #[test]
    fn test_zero_divisor_does_not_panic() {
        let policy = PricingPolicy {
            like_divisor: 0,
            exchange_weight: 2,
            bonus_cap: 100,
        };
        // Falls back to a divisor of one
        assert_eq!(policy.popularity_bonus(5, 0), 5);
    }

    #[test]
    fn test_quote_breakdown() {
        let policy = PricingPolicy::default();
        let quote = policy.quote(&card(10, 50, 3));
        assert_eq!(quote.base_price, 10);
        assert_eq!(quote.popularity_bonus, 11);
        assert_eq!(quote.final_price, 21);
        assert_eq!(quote.final_price, policy.price(&card(10, 50, 3)));
    }
}
