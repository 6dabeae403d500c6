//! Exchange request types for the Card Exchange Engine
//!
//! This module defines the exchange request lifecycle model: the request
//! record itself, its status state machine, and the result/report types
//! returned by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger::CoinAmount;

/// User identifier
pub type UserId = u64;

/// Card identifier
pub type CardId = u64;

/// Exchange request identifier
///
/// Generated at request creation; also used as the `reference_id` of every
/// coin transaction the request produces.
pub type ExchangeId = Uuid;

/// Lifecycle status of an exchange request
///
/// A request is created in `Pending` and transitions exactly once into one
/// of the four terminal states. No transition out of a terminal state is
/// permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    /// Awaiting a decision by the card owner; the price is held in escrow
    Pending,

    /// Owner accepted: escrow settled to the owner, card granted to requester
    Accepted,

    /// Owner rejected: escrow refunded to the requester
    Rejected,

    /// Requester withdrew the request: escrow refunded to the requester
    Cancelled,

    /// The request outlived its expiration window: escrow refunded
    Expired,
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeStatus::Pending => write!(f, "pending"),
            ExchangeStatus::Accepted => write!(f, "accepted"),
            ExchangeStatus::Rejected => write!(f, "rejected"),
            ExchangeStatus::Cancelled => write!(f, "cancelled"),
            ExchangeStatus::Expired => write!(f, "expired"),
        }
    }
}

impl ExchangeStatus {
    /// Check whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExchangeStatus::Accepted
                | ExchangeStatus::Rejected
                | ExchangeStatus::Cancelled
                | ExchangeStatus::Expired
        )
    }

    /// Check whether an accept transition is permitted from this status
    pub fn can_accept(&self) -> bool {
        matches!(self, ExchangeStatus::Pending)
    }

    /// Check whether a reject transition is permitted from this status
    pub fn can_reject(&self) -> bool {
        matches!(self, ExchangeStatus::Pending)
    }

    /// Check whether a cancel transition is permitted from this status
    pub fn can_cancel(&self) -> bool {
        matches!(self, ExchangeStatus::Pending)
    }
}

impl Default for ExchangeStatus {
    fn default() -> Self {
        ExchangeStatus::Pending
    }
}

/// An exchange request record
///
/// The price (`coin_amount`) is fixed at creation time and debited from the
/// requester as escrow; all later transitions either settle it to the owner
/// (accept) or refund it to the requester (reject/cancel/expire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    /// Unique request identifier
    pub id: ExchangeId,

    /// The user asking for access to the card
    pub requester_id: UserId,

    /// The card being requested
    pub card_id: CardId,

    /// The card's owner at creation time; the only user who may accept or reject
    pub owner_id: UserId,

    /// Escrowed price, fixed at creation time (always positive)
    pub coin_amount: CoinAmount,

    /// Current lifecycle status
    pub status: ExchangeStatus,

    /// Optional note from the requester to the owner
    pub message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Deadline after which the request is due for expiration
    pub expires_at: DateTime<Utc>,

    /// Timestamp of the last status change
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRequest {
    /// Check whether the request is past its expiration deadline at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check whether the request is still pending and inside its window at `now`
    pub fn is_actionable(&self, now: DateTime<Utc>) -> bool {
        self.status == ExchangeStatus::Pending && !self.is_expired(now)
    }
}

/// Result of a successful exchange acceptance
///
/// Carries both parties' post-settlement balances so the caller can render
/// authoritative state without a follow-up query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResult {
    pub exchange_id: ExchangeId,
    pub card_id: CardId,
    pub requester_new_balance: CoinAmount,
    pub owner_new_balance: CoinAmount,
}

/// Summary of one expiration sweep pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationReport {
    /// Number of due pending requests found by the sweep query
    pub total_found: usize,

    /// Number of requests expired and refunded by this pass
    pub processed_count: usize,

    /// Number of requests that failed with a non-race error
    pub failed_count: usize,

    /// Total coins refunded by this pass
    pub total_refunded_amount: CoinAmount,
}

impl ExpirationReport {
    /// Check whether no request failed to process
    pub fn all_successful(&self) -> bool {
        self.failed_count == 0
    }

    /// Check whether this pass expired at least one request
    pub fn has_processed(&self) -> bool {
        self.processed_count > 0
    }
}
