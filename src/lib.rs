//! Card Exchange Engine Library
//! # Overview
//!
//! This library implements a card exchange and coin ledger engine: users
//! trade accumulated coins for access to each other's content cards, with
//! balances kept consistent under concurrent requests, acceptances,
//! rejections, cancellations, and time-based expiration.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (ExchangeRequest, CoinTransaction, etc.)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Authoritative balances and the append-only
//!     transaction log
//!   - [`core::orchestrator`] - The exchange request state machine
//!   - [`core::request_store`] - Request records and the pending-pair index
//!   - [`core::pricing`] - Popularity-adjusted price calculation
//!   - [`core::collection`] - Granted card access
//!   - [`core::catalog`] - Card catalog seam
//!   - [`core::sweeper`] - Background expiration task
//! - [`io`] - Operation log parsing and balance output
//! - [`replay`] - Offline replay harness driving the engine from a CSV log
//!
//! # Request Lifecycle
//!
//! A request is created in `Pending` with the card's price debited from the
//! requester as escrow, and resolves exactly once:
//!
//! - **Accept**: escrow settles to the owner; the requester is granted the card
//! - **Reject**: the owner declines; escrow refunds to the requester
//! - **Cancel**: the requester withdraws; escrow refunds to the requester
//! - **Expire**: the 72-hour window lapses; the sweeper refunds the escrow
//!
//! # Concurrency
//!
//! Per-user balance mutations serialize on the user's ledger entry;
//! per-request transitions are conditional updates under the request's
//! entry. Operations on different users or requests proceed in parallel
//! with no global lock.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use self::core::{
    spawn_expiration_sweeper, CardCatalog, CoinLedger, CollectionStore, ExchangeConfig,
    ExchangeOrchestrator, ExchangeRequestStore, ExpirationSweeper, InMemoryCardCatalog,
    PriceQuote, PricingPolicy,
};
pub use io::write_balances_csv;
pub use types::{
    CardId, CardInfo, CoinAmount, CoinReason, CoinTransaction, CollectionEntry, ErrorKind,
    ExchangeError, ExchangeId, ExchangeRequest, ExchangeResult, ExchangeStatus, ExpirationReport,
    UserId,
};
