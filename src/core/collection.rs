//! Collection grantor
//!
//! Records which users hold access to which cards. An entry is created
//! exactly once per successful acceptance; the insert is idempotent so a
//! retried acceptance cannot duplicate it.

use chrono::Utc;
use dashmap::DashMap;

use crate::types::{CardId, CollectionEntry, CollectionSource, UserId};

/// Store of granted card access
#[derive(Debug, Default)]
pub struct CollectionStore {
    entries: DashMap<(UserId, CardId), CollectionEntry>,
}

impl CollectionStore {
    /// Create a new empty collection store
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Grant a user access to a card
    ///
    /// Idempotent: if the entry already exists this is a no-op, not an
    /// error. Returns `true` if a new entry was created.
    pub fn grant(&self, user_id: UserId, card_id: CardId) -> bool {
        let mut inserted = false;
        self.entries.entry((user_id, card_id)).or_insert_with(|| {
            inserted = true;
            CollectionEntry {
                user_id,
                card_id,
                collected_at: Utc::now(),
                source: CollectionSource::Exchange,
            }
        });
        inserted
    }

    /// Check whether a user holds a card
    pub fn contains(&self, user_id: UserId, card_id: CardId) -> bool {
        self.entries.contains_key(&(user_id, card_id))
    }

    /// All cards a user holds, sorted by card ID
    pub fn entries_for(&self, user_id: UserId) -> Vec<CollectionEntry> {
        let mut entries: Vec<CollectionEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.card_id);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_and_contains() {
        let store = CollectionStore::new();
        assert!(!store.contains(1, 10));

        assert!(store.grant(1, 10));
        assert!(store.contains(1, 10));
        assert!(!store.contains(1, 11));
        assert!(!store.contains(2, 10));
    }

    #[test]
    fn test_grant_is_idempotent() {
        let store = CollectionStore::new();
        assert!(store.grant(1, 10));
        assert!(!store.grant(1, 10));

        assert_eq!(store.entries_for(1).len(), 1);
    }

    #[test]
    fn test_entries_for_sorted_by_card() {
        let store = CollectionStore::new();
        store.grant(1, 30);
        store.grant(1, 10);
        store.grant(1, 20);
        store.grant(2, 5);

        let cards: Vec<_> = store.entries_for(1).iter().map(|e| e.card_id).collect();
        assert_eq!(cards, vec![10, 20, 30]);
    }

    #[test]
    fn test_concurrent_grants_create_one_entry() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(CollectionStore::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || store.grant(1, 10)));
        }

        let inserted: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(inserted, 1);
        assert_eq!(store.entries_for(1).len(), 1);
    }
}
