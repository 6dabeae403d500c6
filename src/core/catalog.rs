//! Card catalog seam
//!
//! The exchange engine does not own card data. `CardCatalog` is the narrow
//! read-only interface it consumes: resolve a card ID to its owner, base
//! price, and popularity counters. `InMemoryCardCatalog` is the concrete
//! implementation used by the replay driver and tests; a production
//! deployment substitutes its own catalog behind the same trait.

use dashmap::DashMap;

use crate::types::{CardId, CardInfo, ExchangeError};

/// Read-only card lookup consumed by the engine
///
/// The engine treats the catalog as read-only within its operations: it
/// never mutates card data, only reads the snapshot returned here.
pub trait CardCatalog: Send + Sync {
    /// Resolve a card ID to its current catalog view
    fn card(&self, card_id: CardId) -> Option<CardInfo>;
}

/// In-memory card catalog
///
/// Thread-safe via `DashMap`. Registration validates the base price;
/// popularity counters are owned here and mutated only through this
/// catalog's own methods, never by the engine.
#[derive(Debug, Default)]
pub struct InMemoryCardCatalog {
    cards: DashMap<CardId, CardInfo>,
}

impl InMemoryCardCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            cards: DashMap::new(),
        }
    }

    /// Register a card
    ///
    /// Rejects non-positive base prices. If the card ID is already
    /// registered, the first registration wins.
    ///
    /// # Errors
    ///
    /// * `InvalidBasePrice` - `base_price` is zero or negative
    pub fn register_card(&self, card: CardInfo) -> Result<(), ExchangeError> {
        if card.base_price <= 0 {
            return Err(ExchangeError::invalid_base_price(card.id, card.base_price));
        }
        self.cards.entry(card.id).or_insert(card);
        Ok(())
    }

    /// Add likes to a card's popularity counter
    ///
    /// # Errors
    ///
    /// * `CardNotFound` - The card is not registered
    pub fn add_likes(&self, card_id: CardId, count: u32) -> Result<(), ExchangeError> {
        let mut entry = self
            .cards
            .get_mut(&card_id)
            .ok_or_else(|| ExchangeError::card_not_found(card_id))?;
        entry.like_count = entry.like_count.saturating_add(count);
        Ok(())
    }

    /// Record a completed exchange against a card
    ///
    /// Called by the catalog's owner after an acceptance settles; the
    /// engine itself never calls this.
    ///
    /// # Errors
    ///
    /// * `CardNotFound` - The card is not registered
    pub fn record_exchange(&self, card_id: CardId) -> Result<(), ExchangeError> {
        let mut entry = self
            .cards
            .get_mut(&card_id)
            .ok_or_else(|| ExchangeError::card_not_found(card_id))?;
        entry.exchange_count = entry.exchange_count.saturating_add(1);
        Ok(())
    }
}

impl CardCatalog for InMemoryCardCatalog {
    fn card(&self, card_id: CardId) -> Option<CardInfo> {
        self.cards.get(&card_id).map(|entry| entry.value().clone())
    }
}
