//! Operation log replay
//!
//! Drives a fresh exchange engine from a CSV operation log and writes the
//! final balances as CSV. This is the engine's offline harness: the same
//! orchestrator a service would call per request, fed from a file.
//!
//! # Error Handling
//!
//! Fatal errors (file not found, output I/O) abort the replay. Rejected
//! operations (insufficient balance, forbidden transitions, duplicate
//! requests) are the engine doing its job: they are logged and the replay
//! continues with the next row.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::core::catalog::InMemoryCardCatalog;
use crate::core::collection::CollectionStore;
use crate::core::config::ExchangeConfig;
use crate::core::ledger::CoinLedger;
use crate::core::orchestrator::ExchangeOrchestrator;
use crate::core::request_store::ExchangeRequestStore;
use crate::io::csv_format::{write_balances_csv, Operation};
use crate::io::reader::OpReader;
use crate::types::{CardInfo, ExchangeError};

/// Replay an operation log and write final balances to `output`
///
/// Builds a fresh engine from `config`, streams the log through it, and
/// writes the resulting balances sorted by user ID.
///
/// # Errors
///
/// Returns an error if the input file cannot be opened or the output
/// cannot be written. Individual operation failures never abort the
/// replay.
pub fn run(
    input_path: &Path,
    output: &mut dyn Write,
    config: ExchangeConfig,
) -> Result<(), String> {
    let catalog = Arc::new(InMemoryCardCatalog::new());
    let orchestrator = ExchangeOrchestrator::new(
        catalog.clone(),
        Arc::new(CoinLedger::new()),
        Arc::new(ExchangeRequestStore::new()),
        Arc::new(CollectionStore::new()),
        config,
    );

    let reader = OpReader::new(input_path)?;

    for result in reader {
        match result {
            Ok(operation) => {
                if let Err(e) = apply(&orchestrator, &catalog, operation) {
                    tracing::warn!(error = %e, "Operation rejected");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed operation");
            }
        }
    }

    write_balances_csv(&orchestrator.ledger().all_balances(), output)
}

/// Apply a single operation to the engine
///
/// Accept, reject, and cancel rows address a request by its
/// `(requester, card)` pair; the at-most-one-pending invariant makes that
/// pair an unambiguous handle.
fn apply(
    orchestrator: &ExchangeOrchestrator,
    catalog: &InMemoryCardCatalog,
    operation: Operation,
) -> Result<(), ExchangeError> {
    match operation {
        Operation::OpenAccount { user, amount } => {
            orchestrator.ledger().open_account(user, amount);
            Ok(())
        }
        Operation::RegisterCard {
            owner,
            card,
            base_price,
        } => catalog.register_card(CardInfo {
            id: card,
            owner_id: owner,
            base_price,
            like_count: 0,
            exchange_count: 0,
        }),
        Operation::Like { card, count } => catalog.add_likes(card, count),
        Operation::Request { requester, card } => orchestrator
            .create_request(requester, card, None)
            .map(|_| ()),
        Operation::Accept {
            owner,
            card,
            requester,
        } => {
            let exchange_id = orchestrator
                .requests()
                .pending_id(requester, card)
                .ok_or_else(|| ExchangeError::pending_request_not_found(requester, card))?;
            let result = orchestrator.accept(exchange_id, owner)?;
            // The catalog owns the popularity counters; completed exchanges
            // feed back into future prices.
            catalog.record_exchange(result.card_id)
        }
        Operation::Reject {
            owner,
            card,
            requester,
        } => {
            let exchange_id = orchestrator
                .requests()
                .pending_id(requester, card)
                .ok_or_else(|| ExchangeError::pending_request_not_found(requester, card))?;
            orchestrator.reject(exchange_id, owner)
        }
        Operation::Cancel { requester, card } => {
            let exchange_id = orchestrator
                .requests()
                .pending_id(requester, card)
                .ok_or_else(|| ExchangeError::pending_request_not_found(requester, card))?;
            orchestrator.cancel(exchange_id, requester)
        }
        Operation::Sweep => {
            orchestrator.process_expired(Utc::now());
            Ok(())
        }
    }
}
