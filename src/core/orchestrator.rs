//! Exchange orchestration
//!
//! This module provides the `ExchangeOrchestrator`, the state machine that
//! creates, accepts, rejects, cancels, and expires exchange requests by
//! coordinating the coin ledger, the request store, the collection grantor,
//! and the card catalog seam.
//!
//! # State machine
//!
//! `Pending` transitions exactly once to one of `Accepted`, `Rejected`,
//! `Cancelled`, or `Expired`; all four are terminal. Every transition runs
//! as a conditional update under the request's entry lock, so concurrent
//! callers racing for the same request see exactly one success and
//! `AlreadyProcessed` everywhere else.
//!
//! # Escrow discipline
//!
//! The price is debited from the requester at creation and held against the
//! request. Acceptance settles it to the owner; every other terminal state
//! refunds it. Reject, cancel, and expire share one refund path.
//!
//! # Thread Safety
//!
//! The orchestrator is cloneable and safe to share across threads; all
//! state lives in `Arc`-wrapped components with per-entry locking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::catalog::CardCatalog;
use crate::core::collection::CollectionStore;
use crate::core::config::ExchangeConfig;
use crate::core::ledger::CoinLedger;
use crate::core::pricing::PriceQuote;
use crate::core::request_store::ExchangeRequestStore;
use crate::types::{
    CardId, CoinAmount, CoinReason, CollectionEntry, ExchangeError, ExchangeId, ExchangeRequest,
    ExchangeResult, ExchangeStatus, ExpirationReport, UserId,
};

/// The exchange request state machine
///
/// Holds shared handles to the ledger, request store, collection store, and
/// the card catalog collaborator. Constructed explicitly and passed by
/// reference; there is no global instance.
#[derive(Clone)]
pub struct ExchangeOrchestrator {
    /// External card catalog, read-only within engine operations
    catalog: Arc<dyn CardCatalog>,

    /// Authoritative balances and transaction log
    ledger: Arc<CoinLedger>,

    /// Request records and the pending-pair index
    requests: Arc<ExchangeRequestStore>,

    /// Granted card access
    collection: Arc<CollectionStore>,

    config: ExchangeConfig,
}

impl ExchangeOrchestrator {
    /// Create a new orchestrator over the given components
    pub fn new(
        catalog: Arc<dyn CardCatalog>,
        ledger: Arc<CoinLedger>,
        requests: Arc<ExchangeRequestStore>,
        collection: Arc<CollectionStore>,
        config: ExchangeConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            requests,
            collection,
            config,
        }
    }

    /// The underlying coin ledger
    pub fn ledger(&self) -> &CoinLedger {
        &self.ledger
    }

    /// The underlying request store
    pub fn requests(&self) -> &ExchangeRequestStore {
        &self.requests
    }

    /// The underlying collection store
    pub fn collection(&self) -> &CollectionStore {
        &self.collection
    }

    /// Create an exchange request
    ///
    /// Validates in order: the card exists, the requester is not the owner,
    /// the requester has not already collected the card, and no pending
    /// request for the pair exists. Then prices the card, debits the escrow
    /// from the requester, and stores the request in `Pending` with an
    /// expiration deadline.
    ///
    /// The escrow debit runs while the pending-pair slot is reserved, so
    /// either the request exists with its escrow committed or nothing
    /// happened at all.
    ///
    /// # Arguments
    ///
    /// * `requester_id` - The user asking for the card
    /// * `card_id` - The card being requested
    /// * `message` - Optional note to the owner
    ///
    /// # Errors
    ///
    /// * `CardNotFound` - The card does not exist
    /// * `CannotExchangeOwnCard` - The requester owns the card
    /// * `AlreadyCollected` - The requester already holds the card
    /// * `AlreadyRequested` - A pending request for the pair exists
    /// * `InsufficientBalance` - The requester cannot cover the price
    pub fn create_request(
        &self,
        requester_id: UserId,
        card_id: CardId,
        message: Option<String>,
    ) -> Result<ExchangeRequest, ExchangeError> {
        let card = self
            .catalog
            .card(card_id)
            .ok_or_else(|| ExchangeError::card_not_found(card_id))?;

        if card.owner_id == requester_id {
            return Err(ExchangeError::cannot_exchange_own_card(card_id));
        }

        if self.collection.contains(requester_id, card_id) {
            return Err(ExchangeError::already_collected(requester_id, card_id));
        }

        // Fast-path check; the store re-checks atomically below
        if self.requests.pending_id(requester_id, card_id).is_some() {
            return Err(ExchangeError::already_requested(requester_id, card_id));
        }

        let coin_amount = self.config.pricing.price(&card);
        let owner_id = card.owner_id;
        let expiration = self.config.expiration();

        let request = self
            .requests
            .create_pending_with(requester_id, card_id, || {
                let id = Uuid::new_v4();
                self.ledger
                    .debit(requester_id, coin_amount, CoinReason::ExchangeEscrow, id)?;
                let now = Utc::now();
                Ok(ExchangeRequest {
                    id,
                    requester_id,
                    card_id,
                    owner_id,
                    coin_amount,
                    status: ExchangeStatus::Pending,
                    message,
                    created_at: now,
                    expires_at: now + expiration,
                    updated_at: now,
                })
            })?;

        tracing::info!(
            exchange_id = %request.id,
            requester_id,
            card_id,
            coin_amount,
            "Exchange request created"
        );

        Ok(request)
    }

    /// Accept an exchange request
    ///
    /// Only the card owner may accept, and only while the request is
    /// pending and inside its window. On success the escrow settles to the
    /// owner, the requester is granted the card, and both parties' new
    /// balances are returned.
    ///
    /// If the request is pending but past its deadline, the acceptance
    /// resolves it as expired instead (refunding the requester) and reports
    /// `RequestExpired`.
    ///
    /// # Errors
    ///
    /// * `RequestNotFound` - No such request
    /// * `Forbidden` - The acting user is not the card owner
    /// * `RequestExpired` - The request was past its deadline (now refunded)
    /// * `AlreadyProcessed` - The request already left the pending state
    pub fn accept(
        &self,
        exchange_id: ExchangeId,
        acting_user_id: UserId,
    ) -> Result<ExchangeResult, ExchangeError> {
        let request = self
            .requests
            .get(exchange_id)
            .ok_or_else(|| ExchangeError::request_not_found(exchange_id))?;

        if request.owner_id != acting_user_id {
            return Err(ExchangeError::forbidden(exchange_id, acting_user_id));
        }

        let now = Utc::now();
        if request.status == ExchangeStatus::Pending && request.is_expired(now) {
            // The owner acted after the deadline; resolve through the
            // expiration path instead of settling.
            self.close_with_refund(exchange_id, ExchangeStatus::Expired)?;
            tracing::info!(
                exchange_id = %exchange_id,
                "Acceptance arrived after the deadline; request expired and refunded"
            );
            return Err(ExchangeError::request_expired(exchange_id));
        }

        let snapshot = self.requests.transition(exchange_id, |request| {
            if !request.status.can_accept() {
                return Err(ExchangeError::already_processed(request.id, request.status));
            }
            request.status = ExchangeStatus::Accepted;
            request.updated_at = now;
            Ok(request.clone())
        })?;

        let (owner_new_balance, _) = self.ledger.credit(
            snapshot.owner_id,
            snapshot.coin_amount,
            CoinReason::ExchangeSettlement,
            exchange_id,
        )?;
        self.collection.grant(snapshot.requester_id, snapshot.card_id);
        self.requests
            .release_pending(snapshot.requester_id, snapshot.card_id, exchange_id);

        tracing::info!(
            exchange_id = %exchange_id,
            card_id = snapshot.card_id,
            requester_id = snapshot.requester_id,
            owner_id = snapshot.owner_id,
            coin_amount = snapshot.coin_amount,
            "Exchange request accepted"
        );

        Ok(ExchangeResult {
            exchange_id,
            card_id: snapshot.card_id,
            requester_new_balance: self.ledger.balance(snapshot.requester_id),
            owner_new_balance,
        })
    }

    /// Reject an exchange request
    ///
    /// Only the card owner may reject a pending request. The escrow is
    /// refunded to the requester; no collection entry is created and the
    /// owner's balance never changes.
    ///
    /// # Errors
    ///
    /// * `RequestNotFound` - No such request
    /// * `Forbidden` - The acting user is not the card owner
    /// * `AlreadyProcessed` - The request already left the pending state
    pub fn reject(
        &self,
        exchange_id: ExchangeId,
        acting_user_id: UserId,
    ) -> Result<(), ExchangeError> {
        let request = self
            .requests
            .get(exchange_id)
            .ok_or_else(|| ExchangeError::request_not_found(exchange_id))?;

        if request.owner_id != acting_user_id {
            return Err(ExchangeError::forbidden(exchange_id, acting_user_id));
        }

        let refunded = self.close_with_refund(exchange_id, ExchangeStatus::Rejected)?;

        tracing::info!(
            exchange_id = %exchange_id,
            requester_id = request.requester_id,
            refund_amount = refunded,
            "Exchange request rejected"
        );

        Ok(())
    }

    /// Cancel an exchange request
    ///
    /// Only the requester may cancel their own pending request. The refund
    /// path is identical to rejection.
    ///
    /// # Errors
    ///
    /// * `RequestNotFound` - No such request
    /// * `Forbidden` - The acting user is not the requester
    /// * `AlreadyProcessed` - The request already left the pending state
    pub fn cancel(
        &self,
        exchange_id: ExchangeId,
        acting_user_id: UserId,
    ) -> Result<(), ExchangeError> {
        let request = self
            .requests
            .get(exchange_id)
            .ok_or_else(|| ExchangeError::request_not_found(exchange_id))?;

        if request.requester_id != acting_user_id {
            return Err(ExchangeError::forbidden(exchange_id, acting_user_id));
        }

        let refunded = self.close_with_refund(exchange_id, ExchangeStatus::Cancelled)?;

        tracing::info!(
            exchange_id = %exchange_id,
            requester_id = request.requester_id,
            refund_amount = refunded,
            "Exchange request cancelled"
        );

        Ok(())
    }

    /// Expire all pending requests due at `now`
    ///
    /// Each due request is resolved through the same conditional transition
    /// and refund path as rejection. Requests that raced to a terminal
    /// state are skipped silently; a failure on one request never aborts
    /// the rest of the batch.
    pub fn process_expired(&self, now: DateTime<Utc>) -> ExpirationReport {
        let due = self.requests.expired_pending(now);
        let total_found = due.len();
        let mut processed_count = 0;
        let mut failed_count = 0;
        let mut total_refunded_amount: CoinAmount = 0;

        for exchange_id in due {
            match self.close_with_refund(exchange_id, ExchangeStatus::Expired) {
                Ok(amount) => {
                    processed_count += 1;
                    total_refunded_amount += amount;
                    tracing::info!(
                        exchange_id = %exchange_id,
                        refund_amount = amount,
                        "Expired exchange request refunded"
                    );
                }
                // Another actor resolved the request first; nothing to do
                Err(ExchangeError::AlreadyProcessed { .. }) => {}
                Err(e) => {
                    failed_count += 1;
                    tracing::error!(
                        exchange_id = %exchange_id,
                        error = %e,
                        "Failed to expire exchange request"
                    );
                }
            }
        }

        ExpirationReport {
            total_found,
            processed_count,
            failed_count,
            total_refunded_amount,
        }
    }

    /// Transition a pending request to a refunding terminal state
    ///
    /// The shared path behind reject, cancel, and expire: a conditional
    /// "only while pending" transition followed by the escrow refund and
    /// the release of the pending-pair slot. Returns the refunded amount.
    fn close_with_refund(
        &self,
        exchange_id: ExchangeId,
        terminal: ExchangeStatus,
    ) -> Result<CoinAmount, ExchangeError> {
        let snapshot = self.requests.transition(exchange_id, |request| {
            if request.status != ExchangeStatus::Pending {
                return Err(ExchangeError::already_processed(request.id, request.status));
            }
            request.status = terminal;
            request.updated_at = Utc::now();
            Ok(request.clone())
        })?;

        self.ledger.credit(
            snapshot.requester_id,
            snapshot.coin_amount,
            CoinReason::ExchangeRefund,
            exchange_id,
        )?;
        self.requests
            .release_pending(snapshot.requester_id, snapshot.card_id, exchange_id);

        Ok(snapshot.coin_amount)
    }

    /// Pending requests addressed to `user_id` as card owner, newest first
    pub fn pending_requests(&self, user_id: UserId) -> Vec<ExchangeRequest> {
        self.requests.pending_for_owner(user_id, Utc::now())
    }

    /// All requests sent by `user_id`, any status, newest first
    pub fn sent_requests(&self, user_id: UserId) -> Vec<ExchangeRequest> {
        self.requests.sent_by(user_id)
    }

    /// Current exchange price of a card
    ///
    /// # Errors
    ///
    /// * `CardNotFound` - The card does not exist
    pub fn price(&self, card_id: CardId) -> Result<CoinAmount, ExchangeError> {
        let card = self
            .catalog
            .card(card_id)
            .ok_or_else(|| ExchangeError::card_not_found(card_id))?;
        Ok(self.config.pricing.price(&card))
    }

    /// Price breakdown of a card
    ///
    /// # Errors
    ///
    /// * `CardNotFound` - The card does not exist
    pub fn quote(&self, card_id: CardId) -> Result<PriceQuote, ExchangeError> {
        let card = self
            .catalog
            .card(card_id)
            .ok_or_else(|| ExchangeError::card_not_found(card_id))?;
        Ok(self.config.pricing.quote(&card))
    }

    /// Cards held by a user through completed exchanges
    pub fn collection_of(&self, user_id: UserId) -> Vec<CollectionEntry> {
        self.collection.entries_for(user_id)
    }
}
