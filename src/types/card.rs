//! Card catalog view and collection entry types
//!
//! The engine never owns card data; `CardInfo` is the narrow read-only view
//! it consumes from the Card Catalog collaborator (owner, base price, and
//! the popularity counters that feed pricing). `CollectionEntry` records
//! access granted through a completed exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::exchange::{CardId, UserId};
use super::ledger::CoinAmount;

/// The catalog's view of a card, as consumed at pricing time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    pub id: CardId,

    /// The user who owns the card and may accept or reject requests for it
    pub owner_id: UserId,

    /// Owner-configured price floor (always positive)
    pub base_price: CoinAmount,

    /// Popularity signal: total likes
    pub like_count: u32,

    /// Popularity signal: completed exchanges
    pub exchange_count: u32,
}

/// How a collection entry came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSource {
    Exchange,
}

/// A record that a user holds access to a card
///
/// Created exactly once per successful acceptance; never created for any
/// other exchange outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub user_id: UserId,
    pub card_id: CardId,
    pub collected_at: DateTime<Utc>,
    pub source: CollectionSource,
}
