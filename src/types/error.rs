//! Error types for the Card Exchange Engine
//!
//! This module defines all error kinds the engine can surface. Each variant
//! carries enough context to produce a specific, actionable message.
//!
//! # Error Categories
//!
//! - **Validation Errors**: rejected before any mutation (own-card requests,
//!   duplicate requests, invalid base prices)
//! - **Business-Rule Errors**: expected, recoverable outcomes that leave no
//!   partial state (insufficient balance, already-processed transitions,
//!   authorization failures, missing records)
//! - **Transient Errors**: the store backend exceeded its commit deadline;
//!   the operation is safe to retry
//! - **Fatal Errors**: balance-integrity failures that indicate a bug and
//!   must reach an operator
//! - **I/O Errors**: file and CSV problems on the replay surface

use thiserror::Error;

use super::exchange::{CardId, ExchangeId, ExchangeStatus, UserId};
use super::ledger::CoinAmount;

/// Broad classification of an [`ExchangeError`]
///
/// Mirrors the engine's propagation policy: validation and business-rule
/// errors are expected outcomes, transient errors are retryable, fatal
/// errors indicate a data-integrity bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    BusinessRule,
    Transient,
    Fatal,
    Io,
}

/// Main error type for the exchange engine
///
/// Every ledger and orchestrator operation returns a typed result carrying
/// one of these variants; no operation leaves partial state behind on error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    /// The requested card does not exist in the catalog
    #[error("Card {card_id} not found")]
    CardNotFound {
        /// Card ID that was not found
        card_id: CardId,
    },

    /// The referenced exchange request does not exist
    #[error("Exchange request {exchange_id} not found")]
    RequestNotFound {
        /// Exchange request ID that was not found
        exchange_id: ExchangeId,
    },

    /// No pending request exists for the given requester and card
    ///
    /// Surfaced by the replay driver when an accept/reject/cancel row
    /// references a pair with no open request.
    #[error("No pending exchange request by user {user_id} for card {card_id}")]
    PendingRequestNotFound {
        /// Requester the lookup was scoped to
        user_id: UserId,
        /// Card the lookup was scoped to
        card_id: CardId,
    },

    /// A user tried to request their own card
    #[error("Cannot exchange your own card {card_id}")]
    CannotExchangeOwnCard {
        /// The card owned by the requester
        card_id: CardId,
    },

    /// The requester already holds the card in their collection
    #[error("User {user_id} has already collected card {card_id}")]
    AlreadyCollected { user_id: UserId, card_id: CardId },

    /// A pending request for this requester/card pair already exists
    #[error("User {user_id} already has a pending exchange request for card {card_id}")]
    AlreadyRequested { user_id: UserId, card_id: CardId },

    /// The requester cannot cover the escrow debit
    ///
    /// No request is created and no balance changes.
    #[error(
        "Insufficient coin balance for user {user_id}: available {balance}, required {required}"
    )]
    InsufficientBalance {
        user_id: UserId,
        /// Balance at the time of the failed debit
        balance: CoinAmount,
        /// Escrow amount that was requested
        required: CoinAmount,
    },

    /// The request already left the pending state
    ///
    /// Exactly one of any set of concurrent transitions succeeds; all
    /// others observe this error.
    #[error("Exchange request {exchange_id} is already {status}")]
    AlreadyProcessed {
        exchange_id: ExchangeId,
        /// Terminal status the request holds
        status: ExchangeStatus,
    },

    /// The request outlived its expiration window before the owner acted
    ///
    /// The escrow has been refunded to the requester by the time this error
    /// is returned.
    #[error("Exchange request {exchange_id} has expired")]
    RequestExpired { exchange_id: ExchangeId },

    /// The acting user is not entitled to this transition
    #[error("User {user_id} is not allowed to act on exchange request {exchange_id}")]
    Forbidden {
        exchange_id: ExchangeId,
        user_id: UserId,
    },

    /// A card was registered with a non-positive base price
    #[error("Invalid base price {base_price} for card {card_id}")]
    InvalidBasePrice {
        card_id: CardId,
        base_price: CoinAmount,
    },

    /// A balance update would overflow
    ///
    /// Indicates corrupt amounts somewhere upstream; never expected in
    /// normal operation.
    #[error("Arithmetic overflow in {operation} for user {user_id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        user_id: UserId,
    },

    /// The store backend did not commit within its deadline
    ///
    /// The operation still resolves to a definite outcome server-side;
    /// retries are safe under the pending-transition guard.
    #[error("Store unavailable during {operation}")]
    Unavailable { operation: String },

    /// I/O error while reading or writing replay files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV parsing error on the replay surface
    ///
    /// Recoverable: the malformed row is skipped and the replay continues.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        message: String,
    },
}

impl From<std::io::Error> for ExchangeError {
    fn from(error: std::io::Error) -> Self {
        ExchangeError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ExchangeError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        ExchangeError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl ExchangeError {
    /// Classify this error per the engine's propagation policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::CannotExchangeOwnCard { .. }
            | ExchangeError::AlreadyCollected { .. }
            | ExchangeError::AlreadyRequested { .. }
            | ExchangeError::InvalidBasePrice { .. } => ErrorKind::Validation,

            ExchangeError::CardNotFound { .. }
            | ExchangeError::RequestNotFound { .. }
            | ExchangeError::PendingRequestNotFound { .. }
            | ExchangeError::InsufficientBalance { .. }
            | ExchangeError::AlreadyProcessed { .. }
            | ExchangeError::RequestExpired { .. }
            | ExchangeError::Forbidden { .. } => ErrorKind::BusinessRule,

            ExchangeError::Unavailable { .. } => ErrorKind::Transient,

            ExchangeError::ArithmeticOverflow { .. } => ErrorKind::Fatal,

            ExchangeError::IoError { .. } | ExchangeError::ParseError { .. } => ErrorKind::Io,
        }
    }

    /// Check whether retrying the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

// Helper functions for creating common errors

impl ExchangeError {
    /// Create a CardNotFound error
    pub fn card_not_found(card_id: CardId) -> Self {
        ExchangeError::CardNotFound { card_id }
    }

    /// Create a RequestNotFound error
    pub fn request_not_found(exchange_id: ExchangeId) -> Self {
        ExchangeError::RequestNotFound { exchange_id }
    }

    /// Create a PendingRequestNotFound error
    pub fn pending_request_not_found(user_id: UserId, card_id: CardId) -> Self {
        ExchangeError::PendingRequestNotFound { user_id, card_id }
    }

    /// Create a CannotExchangeOwnCard error
    pub fn cannot_exchange_own_card(card_id: CardId) -> Self {
        ExchangeError::CannotExchangeOwnCard { card_id }
    }

    /// Create an AlreadyCollected error
    pub fn already_collected(user_id: UserId, card_id: CardId) -> Self {
        ExchangeError::AlreadyCollected { user_id, card_id }
    }

    /// Create an AlreadyRequested error
    pub fn already_requested(user_id: UserId, card_id: CardId) -> Self {
        ExchangeError::AlreadyRequested { user_id, card_id }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(
        user_id: UserId,
        balance: CoinAmount,
        required: CoinAmount,
    ) -> Self {
        ExchangeError::InsufficientBalance {
            user_id,
            balance,
            required,
        }
    }

    /// Create an AlreadyProcessed error
    pub fn already_processed(exchange_id: ExchangeId, status: ExchangeStatus) -> Self {
        ExchangeError::AlreadyProcessed {
            exchange_id,
            status,
        }
    }

    /// Create a RequestExpired error
    pub fn request_expired(exchange_id: ExchangeId) -> Self {
        ExchangeError::RequestExpired { exchange_id }
    }

    /// Create a Forbidden error
    pub fn forbidden(exchange_id: ExchangeId, user_id: UserId) -> Self {
        ExchangeError::Forbidden {
            exchange_id,
            user_id,
        }
    }

    /// Create an InvalidBasePrice error
    pub fn invalid_base_price(card_id: CardId, base_price: CoinAmount) -> Self {
        ExchangeError::InvalidBasePrice {
            card_id,
            base_price,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, user_id: UserId) -> Self {
        ExchangeError::ArithmeticOverflow {
            operation: operation.to_string(),
            user_id,
        }
    }

    /// Create an Unavailable error
    pub fn unavailable(operation: &str) -> Self {
        ExchangeError::Unavailable {
            operation: operation.to_string(),
        }
    }
}
