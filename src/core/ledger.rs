//! Coin ledger: authoritative balances and the append-only transaction log
//!
//! This module provides the `CoinLedger`, the only component allowed to
//! mutate user balances. Every mutation appends exactly one
//! `CoinTransaction` carrying the post-commit balance.
//!
//! # Design
//!
//! Balances live in a `DashMap` keyed by user ID. Debits and credits run
//! while holding the user's entry lock, so the balance check and the
//! mutation are a single atomic step: two concurrent debits against the
//! same user cannot both pass a check that only one can satisfy.
//!
//! # Thread Safety
//!
//! All operations are safe to call from multiple threads concurrently.
//! Operations on different users proceed in parallel; operations on the
//! same user serialize on that user's entry.
//!
//! # Guarantees
//!
//! After any sequence of concurrent debit/credit calls completes, each
//! balance equals the opening balance plus the sum of all committed
//! transaction amounts for that user, and no balance is ever negative.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::types::{CoinAmount, CoinReason, CoinTransaction, ExchangeError, ExchangeId, UserId};

/// Authoritative per-user balances plus the append-only transaction log
#[derive(Debug, Default)]
pub struct CoinLedger {
    /// Current balance per user
    ///
    /// DashMap's sharded entry locks serialize concurrent mutations of the
    /// same user's balance without a global lock.
    balances: DashMap<UserId, CoinAmount>,

    /// Append-only transaction log keyed by transaction ID
    transactions: DashMap<Uuid, CoinTransaction>,
}

impl CoinLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            transactions: DashMap::new(),
        }
    }

    /// Provision an account with an opening balance
    ///
    /// Opening balances are input from the identity collaborator, not
    /// ledger transactions; the transaction log records only deltas applied
    /// after provisioning. If the account already exists the call is a
    /// no-op (first provisioning wins).
    ///
    /// Negative opening balances are clamped to zero to preserve the
    /// non-negativity invariant.
    pub fn open_account(&self, user_id: UserId, opening_balance: CoinAmount) {
        self.balances
            .entry(user_id)
            .or_insert(opening_balance.max(0));
    }

    /// Current balance for a user
    ///
    /// Unknown users have a zero balance.
    pub fn balance(&self, user_id: UserId) -> CoinAmount {
        self.balances.get(&user_id).map(|b| *b).unwrap_or(0)
    }

    /// Debit coins from a user's balance
    ///
    /// Fails with `InsufficientBalance` if the balance cannot cover the
    /// amount; on success appends a transaction with a negative amount and
    /// returns the new balance alongside it.
    ///
    /// The check and the mutation run under the user's entry lock, so a
    /// concurrent debit cannot slip between them.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user to debit
    /// * `amount` - The amount to debit (callers pass positive amounts)
    /// * `reason` - Why the balance changed
    /// * `reference_id` - The exchange request this debit belongs to
    ///
    /// # Errors
    ///
    /// * `InsufficientBalance` - The balance is below `amount`
    /// * `ArithmeticOverflow` - The subtraction would overflow
    pub fn debit(
        &self,
        user_id: UserId,
        amount: CoinAmount,
        reason: CoinReason,
        reference_id: ExchangeId,
    ) -> Result<(CoinAmount, CoinTransaction), ExchangeError> {
        let mut entry = self.balances.entry(user_id).or_insert(0);
        let balance = *entry.value();

        if balance < amount {
            return Err(ExchangeError::insufficient_balance(
                user_id, balance, amount,
            ));
        }

        let new_balance = balance
            .checked_sub(amount)
            .ok_or_else(|| ExchangeError::arithmetic_overflow("debit", user_id))?;

        *entry.value_mut() = new_balance;
        let transaction = self.append(user_id, -amount, reason, reference_id, new_balance);

        Ok((new_balance, transaction))
    }

    /// Credit coins to a user's balance
    ///
    /// Always succeeds for valid positive amounts; appends a transaction
    /// with a positive amount and returns the new balance alongside it.
    ///
    /// # Errors
    ///
    /// * `ArithmeticOverflow` - The addition would overflow
    pub fn credit(
        &self,
        user_id: UserId,
        amount: CoinAmount,
        reason: CoinReason,
        reference_id: ExchangeId,
    ) -> Result<(CoinAmount, CoinTransaction), ExchangeError> {
        let mut entry = self.balances.entry(user_id).or_insert(0);

        let new_balance = entry
            .value()
            .checked_add(amount)
            .ok_or_else(|| ExchangeError::arithmetic_overflow("credit", user_id))?;

        *entry.value_mut() = new_balance;
        let transaction = self.append(user_id, amount, reason, reference_id, new_balance);

        Ok((new_balance, transaction))
    }

    /// Append a transaction to the log
    ///
    /// Called while the user's balance entry lock is held, so
    /// `balance_after` is consistent with the committed balance.
    fn append(
        &self,
        user_id: UserId,
        amount: CoinAmount,
        reason: CoinReason,
        reference_id: ExchangeId,
        balance_after: CoinAmount,
    ) -> CoinTransaction {
        let transaction = CoinTransaction {
            id: Uuid::new_v4(),
            user_id,
            amount,
            reason,
            reference_id,
            balance_after,
            created_at: Utc::now(),
        };
        self.transactions
            .insert(transaction.id, transaction.clone());
        transaction
    }

    /// All transactions for a user, ordered by creation time
    pub fn transactions_for(&self, user_id: UserId) -> Vec<CoinTransaction> {
        let mut transactions: Vec<CoinTransaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        transactions.sort_by_key(|tx| tx.created_at);
        transactions
    }

    /// All balances, sorted by user ID
    ///
    /// Deterministic ordering for output generation.
    pub fn all_balances(&self) -> Vec<(UserId, CoinAmount)> {
        let mut balances: Vec<(UserId, CoinAmount)> = self
            .balances
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        balances.sort_by_key(|(user_id, _)| *user_id);
        balances
    }

    /// Sum of all balances
    ///
    /// Supports conservation audits: total balances plus currently escrowed
    /// amounts must equal the seeded totals at all times.
    pub fn total_balance(&self) -> CoinAmount {
        self.balances.iter().map(|entry| *entry.value()).sum()
    }
}
