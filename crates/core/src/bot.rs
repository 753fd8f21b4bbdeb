//! Liquidation bot loop.
//!
//! One task, strictly sequential: scan, filter by profit threshold, execute,
//! record, sleep. Shutdown is observed between cycles and during the poll
//! sleep; an in-flight liquidation always runs to completion.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::liquidator::LiquidationExecutor;
use crate::notifier::Notifier;
use crate::scanner::OpportunityScanner;
use crate::stats::LiquidationStats;

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub found: usize,
    /// Below the profit threshold
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Orchestrates scanner, executor, stats and notifications.
pub struct LiquidationBot {
    scanner: OpportunityScanner,
    executor: LiquidationExecutor,
    notifier: Arc<dyn Notifier>,
    min_profit_usd: f64,
    poll_interval: Duration,
    stats: LiquidationStats,
}

impl LiquidationBot {
    pub fn new(
        scanner: OpportunityScanner,
        executor: LiquidationExecutor,
        notifier: Arc<dyn Notifier>,
        min_profit_usd: f64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            scanner,
            executor,
            notifier,
            min_profit_usd,
            poll_interval,
            stats: LiquidationStats::default(),
        }
    }

    pub fn wallet(&self) -> Pubkey {
        self.executor.payer().pubkey()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> LiquidationStats {
        self.stats.clone()
    }

    /// Run cycles until `shutdown` flips to `true` (or its sender is dropped),
    /// then send the final notification and return the stats.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> LiquidationStats {
        let wallet = self.wallet();
        info!(
            %wallet,
            min_profit = format!("${:.2}", self.min_profit_usd),
            rpc_endpoints = self.scanner.pool().len(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting liquidation bot"
        );
        self.notifier.bot_started(&wallet, self.min_profit_usd).await;

        let mut cycles: u64 = 0;
        while !*shutdown.borrow() {
            self.run_cycle().await;
            cycles += 1;

            if wait_for_next_cycle(self.poll_interval, &mut shutdown).await {
                break;
            }
        }

        info!(cycles, "Liquidation bot stopping");
        let stats = self.stats();
        stats.log();
        self.notifier.bot_stopped(&stats).await;
        stats
    }

    /// Scan once and process every opportunity found.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        debug!("Scanning for liquidation opportunities");
        let opportunities = self.scanner.scan().await;
        let mut report = CycleReport {
            found: opportunities.len(),
            ..Default::default()
        };

        if opportunities.is_empty() {
            debug!("No liquidation opportunities found");
            return report;
        }
        info!(count = opportunities.len(), "Found liquidation opportunities");

        for opportunity in &opportunities {
            if opportunity.estimated_profit_usd < self.min_profit_usd {
                report.skipped += 1;
                debug!(
                    profit = format!("${:.2}", opportunity.estimated_profit_usd),
                    "Skipping liquidation below threshold"
                );
                continue;
            }

            info!(
                vault = %opportunity.vault,
                profit = format!("${:.2}", opportunity.estimated_profit_usd),
                "Attempting liquidation"
            );
            self.notifier.opportunity_found(opportunity).await;

            let result = self.executor.execute(opportunity).await;
            self.stats.record(&result);

            if result.success {
                report.succeeded += 1;
                info!(
                    signature = result.signature.as_deref().unwrap_or_default(),
                    profit = format!("${:.2}", result.profit_usd.unwrap_or_default()),
                    "Liquidation successful"
                );
                self.notifier.liquidation_succeeded(&result, opportunity).await;
            } else {
                report.failed += 1;
                error!(
                    error = result.error.as_deref().unwrap_or_default(),
                    "Liquidation failed"
                );
                self.notifier.liquidation_failed(&result, opportunity).await;
            }

            self.stats.log();
        }

        report
    }
}

/// Sleep out `interval`; true when shutdown was requested meanwhile.
async fn wait_for_next_cycle(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = tokio::time::Instant::now() + interval;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                // A dropped sender counts as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
