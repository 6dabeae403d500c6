//! Expiration sweeper background task
//!
//! Periodically resolves pending exchange requests that outlived their
//! expiration window, refunding the escrow through the orchestrator's
//! shared refund path. The sweep transition is conditional, so a request
//! that an accept/reject/cancel raced into a terminal state is skipped
//! silently; running the sweeper is always safe.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::interval;

use crate::core::config::ExchangeConfig;
use crate::core::orchestrator::ExchangeOrchestrator;

/// Background task that expires stale pending requests
///
/// Runs a sweep pass on a fixed interval until a shutdown signal arrives.
/// Failures on individual requests are logged and retried on the next
/// interval; they never stop the loop.
pub struct ExpirationSweeper {
    orchestrator: ExchangeOrchestrator,
    check_interval: Duration,
}

impl ExpirationSweeper {
    /// Create a sweeper using the interval from the engine configuration
    pub fn new(orchestrator: ExchangeOrchestrator, config: &ExchangeConfig) -> Self {
        Self {
            orchestrator,
            check_interval: config.sweep_interval(),
        }
    }

    /// Create a sweeper with a custom interval
    pub fn with_interval(orchestrator: ExchangeOrchestrator, check_interval: Duration) -> Self {
        Self {
            orchestrator,
            check_interval,
        }
    }

    /// Run the sweep loop until shutdown
    ///
    /// Ticks immediately on start, then at each interval. Stops when the
    /// shutdown receiver observes `true`.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.check_interval);

        tracing::info!(
            interval_secs = self.check_interval.as_secs(),
            "Starting expiration sweeper"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Expiration sweeper received shutdown signal");
                        break;
                    }
                }
            }
        }

        tracing::info!("Expiration sweeper stopped");
    }

    /// Run a single sweep pass
    ///
    /// Exposed for tests and manual triggering.
    pub fn sweep_once(&self) {
        let report = self.orchestrator.process_expired(Utc::now());

        if report.has_processed() {
            tracing::info!(
                total_found = report.total_found,
                processed = report.processed_count,
                failed = report.failed_count,
                refunded_amount = report.total_refunded_amount,
                "Processed expired exchange requests"
            );
        } else if report.failed_count > 0 {
            tracing::warn!(
                total_found = report.total_found,
                failed = report.failed_count,
                "Found expired requests but none were processed successfully"
            );
        } else {
            tracing::debug!("No expired exchange requests found");
        }
    }
}

/// Spawn the expiration sweeper on the current tokio runtime
///
/// Returns a shutdown sender; send `true` to stop the task gracefully.
pub fn spawn_expiration_sweeper(
    orchestrator: ExchangeOrchestrator,
    config: &ExchangeConfig,
) -> watch::Sender<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirationSweeper::new(orchestrator, config);

    tokio::spawn(async move {
        sweeper.run(shutdown_rx).await;
    });

    shutdown_tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::InMemoryCardCatalog;
    use crate::core::collection::CollectionStore;
    use crate::core::ledger::CoinLedger;
    use crate::core::pricing::PricingPolicy;
    use crate::core::request_store::ExchangeRequestStore;
    use crate::types::{CardInfo, ExchangeStatus};
    use std::sync::Arc;

    fn orchestrator_with_expiration(hours: i64) -> ExchangeOrchestrator {
        let catalog = Arc::new(InMemoryCardCatalog::new());
        catalog
            .register_card(CardInfo {
                id: 10,
                owner_id: 2,
                base_price: 30,
                like_count: 0,
                exchange_count: 0,
            })
            .unwrap();

        let orchestrator = ExchangeOrchestrator::new(
            catalog,
            Arc::new(CoinLedger::new()),
            Arc::new(ExchangeRequestStore::new()),
            Arc::new(CollectionStore::new()),
            ExchangeConfig::new(hours, 60, PricingPolicy::default()),
        );
        orchestrator.ledger().open_account(1, 100);
        orchestrator.ledger().open_account(2, 0);
        orchestrator
    }

    #[test]
    fn test_sweep_once_expires_due_requests() {
        let orchestrator = orchestrator_with_expiration(0);
        let request = orchestrator.create_request(1, 10, None).unwrap();
        assert_eq!(orchestrator.ledger().balance(1), 70);

        let sweeper =
            ExpirationSweeper::with_interval(orchestrator.clone(), Duration::from_secs(60));
        sweeper.sweep_once();

        assert_eq!(orchestrator.ledger().balance(1), 100);
        assert_eq!(
            orchestrator.requests().get(request.id).unwrap().status,
            ExchangeStatus::Expired
        );
    }

    #[test]
    fn test_sweep_once_ignores_live_requests() {
        let orchestrator = orchestrator_with_expiration(72);
        let request = orchestrator.create_request(1, 10, None).unwrap();

        let sweeper =
            ExpirationSweeper::with_interval(orchestrator.clone(), Duration::from_secs(60));
        sweeper.sweep_once();

        assert_eq!(orchestrator.ledger().balance(1), 70);
        assert_eq!(
            orchestrator.requests().get(request.id).unwrap().status,
            ExchangeStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_spawned_sweeper_expires_and_shuts_down() {
        let orchestrator = orchestrator_with_expiration(0);
        let request = orchestrator.create_request(1, 10, None).unwrap();

        let config = ExchangeConfig::new(0, 1, PricingPolicy::default());
        let shutdown = spawn_expiration_sweeper(orchestrator.clone(), &config);

        // The first tick fires immediately; give the task a moment to run it
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(orchestrator.ledger().balance(1), 100);
        assert_eq!(
            orchestrator.requests().get(request.id).unwrap().status,
            ExchangeStatus::Expired
        );

        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown_signal() {
        let orchestrator = orchestrator_with_expiration(72);
        let sweeper = ExpirationSweeper::with_interval(orchestrator, Duration::from_secs(3600));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            sweeper.run(shutdown_rx).await;
        });

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop after shutdown signal")
            .unwrap();
    }
}
