//! Exchange request storage
//!
//! This module provides the `ExchangeRequestStore`, which owns every
//! exchange request record plus the pending-uniqueness index that enforces
//! at-most-one-pending-request per `(requester, card)` pair.
//!
//! # Concurrency
//!
//! Two disciplines uphold the engine's invariants:
//!
//! - **Reserved slot on create**: `create_pending_with` holds the pending
//!   index entry for the `(requester, card)` pair while the caller's escrow
//!   step runs. A concurrent create for the same pair blocks on the entry
//!   and then observes it occupied; a failed escrow leaves the slot
//!   unreserved and no request behind.
//! - **Conditional transition**: `transition` runs its closure under the
//!   request's entry lock. Every terminal path re-checks `Pending` inside
//!   the closure, so of any set of concurrent transitions exactly one
//!   succeeds and the rest observe the terminal state.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::{
    CardId, CoinAmount, ExchangeError, ExchangeId, ExchangeRequest, ExchangeStatus, UserId,
};

/// Store of exchange requests and the pending-pair index
#[derive(Debug, Default)]
pub struct ExchangeRequestStore {
    /// All requests, keyed by exchange ID
    requests: DashMap<ExchangeId, ExchangeRequest>,

    /// Pending request per `(requester, card)` pair
    ///
    /// An entry exists exactly while that pair has a request in `Pending`.
    pending: DashMap<(UserId, CardId), ExchangeId>,
}

impl ExchangeRequestStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    /// Get a snapshot of a request
    pub fn get(&self, exchange_id: ExchangeId) -> Option<ExchangeRequest> {
        self.requests
            .get(&exchange_id)
            .map(|entry| entry.value().clone())
    }

    /// The pending request ID for a `(requester, card)` pair, if any
    pub fn pending_id(&self, requester_id: UserId, card_id: CardId) -> Option<ExchangeId> {
        self.pending
            .get(&(requester_id, card_id))
            .map(|entry| *entry.value())
    }

    /// Create a pending request while holding the pair's index slot
    ///
    /// The closure performs the fallible part of creation (the escrow
    /// debit) and returns the fully built request. It runs only after the
    /// slot for `(requester, card)` is confirmed vacant, and the slot stays
    /// reserved until the request is stored, so concurrent creates for the
    /// same pair see exactly one success.
    ///
    /// # Errors
    ///
    /// * `AlreadyRequested` - A pending request for the pair already exists
    /// * Any error returned by the closure (the slot is left unreserved)
    pub fn create_pending_with<F>(
        &self,
        requester_id: UserId,
        card_id: CardId,
        build: F,
    ) -> Result<ExchangeRequest, ExchangeError>
    where
        F: FnOnce() -> Result<ExchangeRequest, ExchangeError>,
    {
        match self.pending.entry((requester_id, card_id)) {
            Entry::Occupied(_) => Err(ExchangeError::already_requested(requester_id, card_id)),
            Entry::Vacant(slot) => {
                let request = build()?;
                self.requests.insert(request.id, request.clone());
                slot.insert(request.id);
                Ok(request)
            }
        }
    }

    /// Apply a conditional update to a request under its entry lock
    ///
    /// The closure receives the mutable request and decides whether the
    /// transition applies; returning an error leaves the request untouched
    /// by convention (closures only mutate on their success path).
    ///
    /// # Errors
    ///
    /// * `RequestNotFound` - No request with this ID exists
    /// * Any error returned by the closure
    pub fn transition<F, T>(&self, exchange_id: ExchangeId, f: F) -> Result<T, ExchangeError>
    where
        F: FnOnce(&mut ExchangeRequest) -> Result<T, ExchangeError>,
    {
        let mut entry = self
            .requests
            .get_mut(&exchange_id)
            .ok_or_else(|| ExchangeError::request_not_found(exchange_id))?;
        f(entry.value_mut())
    }

    /// Release the pending index slot held by a resolved request
    ///
    /// Removes the pair entry only if it still points at this exchange, so
    /// a newer pending request for the same pair is never evicted.
    pub fn release_pending(
        &self,
        requester_id: UserId,
        card_id: CardId,
        exchange_id: ExchangeId,
    ) {
        self.pending
            .remove_if(&(requester_id, card_id), |_, id| *id == exchange_id);
    }

    /// Pending requests addressed to an owner, newest first
    ///
    /// Requests already past their deadline are omitted: the owner can no
    /// longer act on them and the sweeper will resolve them.
    pub fn pending_for_owner(
        &self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Vec<ExchangeRequest> {
        let mut requests: Vec<ExchangeRequest> = self
            .requests
            .iter()
            .filter(|entry| {
                let request = entry.value();
                request.owner_id == owner_id && request.is_actionable(now)
            })
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// All requests sent by a requester, any status, newest first
    pub fn sent_by(&self, requester_id: UserId) -> Vec<ExchangeRequest> {
        let mut requests: Vec<ExchangeRequest> = self
            .requests
            .iter()
            .filter(|entry| entry.value().requester_id == requester_id)
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// IDs of pending requests due for expiration at `now`
    pub fn expired_pending(&self, now: DateTime<Utc>) -> Vec<ExchangeId> {
        self.requests
            .iter()
            .filter(|entry| {
                let request = entry.value();
                request.status == ExchangeStatus::Pending && request.is_expired(now)
            })
            .map(|entry| entry.value().id)
            .collect()
    }

    /// Sum of all currently escrowed amounts
    ///
    /// Supports conservation audits alongside `CoinLedger::total_balance`.
    pub fn total_escrowed(&self) -> CoinAmount {
        self.requests
            .iter()
            .filter(|entry| entry.value().status == ExchangeStatus::Pending)
            .map(|entry| entry.value().coin_amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn build_request(requester_id: UserId, card_id: CardId, hours: i64) -> ExchangeRequest {
        let now = Utc::now();
        ExchangeRequest {
            id: Uuid::new_v4(),
            requester_id,
            card_id,
            owner_id: 99,
            coin_amount: 30,
            status: ExchangeStatus::Pending,
            message: None,
            created_at: now,
            expires_at: now + Duration::hours(hours),
            updated_at: now,
        }
    }

    fn insert_pending(store: &ExchangeRequestStore, request: ExchangeRequest) -> ExchangeId {
        store
            .create_pending_with(request.requester_id, request.card_id, || Ok(request))
            .unwrap()
            .id
    }

    #[test]
    fn test_create_and_get() {
        let store = ExchangeRequestStore::new();
        let id = insert_pending(&store, build_request(1, 10, 72));

        let found = store.get(id).unwrap();
        assert_eq!(found.requester_id, 1);
        assert_eq!(found.status, ExchangeStatus::Pending);
        assert_eq!(store.pending_id(1, 10), Some(id));
    }

    #[test]
    fn test_second_pending_for_pair_is_rejected() {
        let store = ExchangeRequestStore::new();
        insert_pending(&store, build_request(1, 10, 72));

        let result = store.create_pending_with(1, 10, || Ok(build_request(1, 10, 72)));
        assert_eq!(
            result.unwrap_err(),
            ExchangeError::already_requested(1, 10)
        );
    }

    #[test]
    fn test_failed_build_leaves_no_trace() {
        let store = ExchangeRequestStore::new();

        let result: Result<ExchangeRequest, _> = store.create_pending_with(1, 10, || {
            Err(ExchangeError::insufficient_balance(1, 0, 30))
        });
        assert!(result.is_err());

        // The slot is free again and no request was stored
        assert_eq!(store.pending_id(1, 10), None);
        assert!(insert_pending(&store, build_request(1, 10, 72)) != Uuid::nil());
    }

    #[test]
    fn test_transition_applies_closure() {
        let store = ExchangeRequestStore::new();
        let id = insert_pending(&store, build_request(1, 10, 72));

        let snapshot = store
            .transition(id, |request| {
                if !request.status.can_accept() {
                    return Err(ExchangeError::already_processed(request.id, request.status));
                }
                request.status = ExchangeStatus::Accepted;
                Ok(request.clone())
            })
            .unwrap();

        assert_eq!(snapshot.status, ExchangeStatus::Accepted);
        assert_eq!(store.get(id).unwrap().status, ExchangeStatus::Accepted);
    }

    #[test]
    fn test_transition_on_missing_request() {
        let store = ExchangeRequestStore::new();
        let result = store.transition(Uuid::new_v4(), |_| Ok(()));
        assert!(matches!(
            result.unwrap_err(),
            ExchangeError::RequestNotFound { .. }
        ));
    }

    #[test]
    fn test_release_pending_only_for_matching_id() {
        let store = ExchangeRequestStore::new();
        let id = insert_pending(&store, build_request(1, 10, 72));

        // A stale release for a different exchange leaves the slot alone
        store.release_pending(1, 10, Uuid::new_v4());
        assert_eq!(store.pending_id(1, 10), Some(id));

        store.release_pending(1, 10, id);
        assert_eq!(store.pending_id(1, 10), None);
    }

    #[test]
    fn test_pending_for_owner_filters_and_sorts() {
        let store = ExchangeRequestStore::new();
        let now = Utc::now();

        insert_pending(&store, build_request(1, 10, 72));
        insert_pending(&store, build_request(2, 11, 72));
        // Due request for the same owner is omitted
        insert_pending(&store, build_request(3, 12, 0));
        // Different owner
        let mut other = build_request(4, 13, 72);
        other.owner_id = 50;
        insert_pending(&store, other);

        let pending = store.pending_for_owner(99, now + Duration::seconds(1));
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|r| r.owner_id == 99));
        assert!(pending[0].created_at >= pending[1].created_at);
    }

    #[test]
    fn test_sent_by_returns_all_statuses() {
        let store = ExchangeRequestStore::new();
        let id = insert_pending(&store, build_request(1, 10, 72));
        insert_pending(&store, build_request(1, 11, 72));

        store
            .transition(id, |request| {
                request.status = ExchangeStatus::Rejected;
                Ok(())
            })
            .unwrap();

        let sent = store.sent_by(1);
        assert_eq!(sent.len(), 2);
        assert!(store.sent_by(2).is_empty());
    }

    #[test]
    fn test_expired_pending_finds_only_due_requests() {
        let store = ExchangeRequestStore::new();
        let now = Utc::now();

        let due = insert_pending(&store, build_request(1, 10, 0));
        insert_pending(&store, build_request(2, 11, 72));

        let accepted = insert_pending(&store, build_request(3, 12, 0));
        store
            .transition(accepted, |request| {
                request.status = ExchangeStatus::Accepted;
                Ok(())
            })
            .unwrap();

        let expired = store.expired_pending(now + Duration::seconds(1));
        assert_eq!(expired, vec![due]);
    }

    #[test]
    fn test_total_escrowed_counts_pending_only() {
        let store = ExchangeRequestStore::new();
        let id = insert_pending(&store, build_request(1, 10, 72));
        insert_pending(&store, build_request(2, 11, 72));
        assert_eq!(store.total_escrowed(), 60);

        store
            .transition(id, |request| {
                request.status = ExchangeStatus::Cancelled;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.total_escrowed(), 30);
    }

    #[test]
    fn test_concurrent_creates_for_same_pair() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(ExchangeRequestStore::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store.create_pending_with(1, 10, || Ok(build_request(1, 10, 72)))
            }));
        }

        let mut successful = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => successful += 1,
                Err(ExchangeError::AlreadyRequested { .. }) => rejected += 1,
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }

        assert_eq!(successful, 1);
        assert_eq!(rejected, 9);
    }

    #[test]
    fn test_concurrent_transitions_exactly_one_succeeds() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(ExchangeRequestStore::new());
        let id = insert_pending(&store, build_request(1, 10, 72));

        let statuses = [
            ExchangeStatus::Accepted,
            ExchangeStatus::Rejected,
            ExchangeStatus::Cancelled,
            ExchangeStatus::Expired,
        ];

        let mut handles = vec![];
        for status in statuses {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store.transition(id, |request| {
                    if request.status != ExchangeStatus::Pending {
                        return Err(ExchangeError::already_processed(
                            request.id,
                            request.status,
                        ));
                    }
                    request.status = status;
                    Ok(())
                })
            }));
        }

        let mut successful = 0;
        for handle in handles {
            if handle.join().unwrap().is_ok() {
                successful += 1;
            }
        }

        assert_eq!(successful, 1);
        assert!(store.get(id).unwrap().status.is_terminal());
    }
}
