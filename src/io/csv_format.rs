//! CSV format handling for operation logs and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - OpRecord structure for deserialization
//! - Conversion from CSV records to typed operations
//! - Balance output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Operation log format
//!
//! Columns: `op,user,card,peer,amount`. Which columns a row uses depends on
//! the operation:
//!
//! | op      | user      | card | peer      | amount          |
//! |---------|-----------|------|-----------|-----------------|
//! | open    | account   |      |           | opening balance |
//! | card    | owner     | card |           | base price      |
//! | like    |           | card |           | likes (default 1) |
//! | request | requester | card |           |                 |
//! | accept  | owner     | card | requester |                 |
//! | reject  | owner     | card | requester |                 |
//! | cancel  | requester | card |           |                 |
//! | sweep   |           |      |           |                 |

use serde::Deserialize;
use std::io::Write;

use crate::types::{CardId, CoinAmount, UserId};

/// CSV record structure for deserialization
///
/// All columns after `op` are optional because each operation uses a
/// different subset; validation happens in [`convert_op_record`].
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OpRecord {
    pub op: String,
    pub user: Option<UserId>,
    pub card: Option<CardId>,
    pub peer: Option<UserId>,
    pub amount: Option<CoinAmount>,
}

/// A typed operation parsed from the log
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Provision an account with an opening balance
    OpenAccount { user: UserId, amount: CoinAmount },

    /// Register a card in the catalog
    RegisterCard {
        owner: UserId,
        card: CardId,
        base_price: CoinAmount,
    },

    /// Add likes to a card's popularity counter
    Like { card: CardId, count: u32 },

    /// Create an exchange request
    Request { requester: UserId, card: CardId },

    /// Accept the pending request by `requester` for `card`
    Accept {
        owner: UserId,
        card: CardId,
        requester: UserId,
    },

    /// Reject the pending request by `requester` for `card`
    Reject {
        owner: UserId,
        card: CardId,
        requester: UserId,
    },

    /// Cancel the requester's own pending request for `card`
    Cancel { requester: UserId, card: CardId },

    /// Run one expiration sweep pass
    Sweep,
}

/// Convert an OpRecord to a typed Operation
///
/// Validates that the columns each operation needs are present.
///
/// # Errors
///
/// Returns a description of the problem (unknown operation, missing
/// column) suitable for logging; the caller skips the row and continues.
pub fn convert_op_record(record: OpRecord) -> Result<Operation, String> {
    let op = record.op.to_lowercase();

    let user = |record: &OpRecord| {
        record
            .user
            .ok_or_else(|| format!("'{}' requires a user column", op))
    };
    let card = |record: &OpRecord| {
        record
            .card
            .ok_or_else(|| format!("'{}' requires a card column", op))
    };
    let peer = |record: &OpRecord| {
        record
            .peer
            .ok_or_else(|| format!("'{}' requires a peer column", op))
    };
    let amount = |record: &OpRecord| {
        record
            .amount
            .ok_or_else(|| format!("'{}' requires an amount column", op))
    };

    match op.as_str() {
        "open" => Ok(Operation::OpenAccount {
            user: user(&record)?,
            amount: amount(&record)?,
        }),
        "card" => Ok(Operation::RegisterCard {
            owner: user(&record)?,
            card: card(&record)?,
            base_price: amount(&record)?,
        }),
        "like" => Ok(Operation::Like {
            card: card(&record)?,
            count: record.amount.unwrap_or(1).max(0) as u32,
        }),
        "request" => Ok(Operation::Request {
            requester: user(&record)?,
            card: card(&record)?,
        }),
        "accept" => Ok(Operation::Accept {
            owner: user(&record)?,
            card: card(&record)?,
            requester: peer(&record)?,
        }),
        "reject" => Ok(Operation::Reject {
            owner: user(&record)?,
            card: card(&record)?,
            requester: peer(&record)?,
        }),
        "cancel" => Ok(Operation::Cancel {
            requester: user(&record)?,
            card: card(&record)?,
        }),
        "sweep" => Ok(Operation::Sweep),
        other => Err(format!("Unknown operation '{}'", other)),
    }
}

/// Write final balances as CSV
///
/// Expects the balances pre-sorted (the ledger returns them sorted by user
/// ID) so output is deterministic.
///
/// # Errors
///
/// Returns an error message if writing to the output fails.
pub fn write_balances_csv(
    balances: &[(UserId, CoinAmount)],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["user", "balance"])
        .map_err(|e| format!("Failed to write output header: {}", e))?;

    for (user, balance) in balances {
        writer
            .write_record([user.to_string(), balance.to_string()])
            .map_err(|e| format!("Failed to write balance row: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}
