//! Coin ledger types for the Card Exchange Engine
//!
//! This module defines the append-only coin transaction record and the
//! reasons a balance may change. Only the three exchange-lifecycle reasons
//! exist here: every coin movement in this subsystem is tied to an exchange
//! request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::exchange::{ExchangeId, UserId};

/// Coin amount
///
/// Coins are integral; signed so that a single transaction type can express
/// both credits (positive) and debits (negative).
pub type CoinAmount = i64;

/// Reason a coin transaction was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinReason {
    /// Price debited from the requester when a request is created
    ExchangeEscrow,

    /// Escrow returned to the requester on reject, cancel, or expire
    ExchangeRefund,

    /// Escrow credited to the owner on accept
    ExchangeSettlement,
}

impl std::fmt::Display for CoinReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoinReason::ExchangeEscrow => write!(f, "exchange_escrow"),
            CoinReason::ExchangeRefund => write!(f, "exchange_refund"),
            CoinReason::ExchangeSettlement => write!(f, "exchange_settlement"),
        }
    }
}

/// A single append-only ledger entry
///
/// Created exactly once per balance-affecting event and never updated or
/// deleted. `balance_after` records the user's balance at commit time, so
/// the log doubles as an audit trail for the balance invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinTransaction {
    /// Unique transaction identifier
    pub id: Uuid,

    /// The user whose balance changed
    pub user_id: UserId,

    /// Signed delta: positive for credits, negative for debits
    pub amount: CoinAmount,

    /// Why the balance changed
    pub reason: CoinReason,

    /// The exchange request this movement belongs to
    pub reference_id: ExchangeId,

    /// The user's balance immediately after this transaction committed
    pub balance_after: CoinAmount,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_reason_display() {
        assert_eq!(CoinReason::ExchangeEscrow.to_string(), "exchange_escrow");
        assert_eq!(CoinReason::ExchangeRefund.to_string(), "exchange_refund");
        assert_eq!(
            CoinReason::ExchangeSettlement.to_string(),
            "exchange_settlement"
        );
    }

    #[test]
    fn test_transaction_carries_signed_amount() {
        let tx = CoinTransaction {
            id: Uuid::new_v4(),
            user_id: 1,
            amount: -30,
            reason: CoinReason::ExchangeEscrow,
            reference_id: Uuid::new_v4(),
            balance_after: 70,
            created_at: Utc::now(),
        };
        assert!(tx.amount < 0);
        assert_eq!(tx.balance_after, 70);
    }
}
