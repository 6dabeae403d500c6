//! Core business logic module
//!
//! This module contains the exchange engine components:
//! - `catalog` - Card catalog seam (trait + in-memory implementation)
//! - `collection` - Granted card access (idempotent collection store)
//! - `config` - Engine configuration (expiration window, sweep cadence, pricing)
//! - `ledger` - Coin balances and the append-only transaction log
//! - `orchestrator` - The exchange request state machine
//! - `pricing` - Exchange price calculation
//! - `request_store` - Request records and the pending-pair index
//! - `sweeper` - Background expiration task

pub mod catalog;
pub mod collection;
pub mod config;
pub mod ledger;
pub mod orchestrator;
pub mod pricing;
pub mod request_store;
pub mod sweeper;

pub use catalog::{CardCatalog, InMemoryCardCatalog};
pub use collection::CollectionStore;
pub use config::ExchangeConfig;
pub use ledger::CoinLedger;
pub use orchestrator::ExchangeOrchestrator;
pub use pricing::{PriceQuote, PricingPolicy};
pub use request_store::ExchangeRequestStore;
pub use sweeper::{spawn_expiration_sweeper, ExpirationSweeper};
