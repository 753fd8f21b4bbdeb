//! Opportunity scanner.
//!
//! Each scan lists every vault, drops inactive ones, then walks the rest
//! strictly one at a time through the RPC pool. Per-vault failures are
//! logged and skipped; a failed vault listing yields an empty scan.

use liquidator_api::{LendProtocol, VaultSnapshot};
use liquidator_chain::RpcPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ScannerConfig;
use crate::opportunity::LiquidationOpportunity;

/// Counters for one scan, logged when it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub vaults: usize,
    /// Dropped by the activity filter
    pub skipped: usize,
    pub scanned: usize,
    pub rate_limited: usize,
    pub failed: usize,
    pub opportunities: usize,
}

/// Finds profitable liquidations across all active vaults.
pub struct OpportunityScanner {
    lend: Arc<dyn LendProtocol>,
    pool: Arc<RpcPool>,
    config: ScannerConfig,
}

impl OpportunityScanner {
    pub fn new(lend: Arc<dyn LendProtocol>, pool: Arc<RpcPool>, config: ScannerConfig) -> Self {
        Self { lend, pool, config }
    }

    pub fn pool(&self) -> &RpcPool {
        &self.pool
    }

    /// A vault is scanned only with non-zero borrow and supply and at least
    /// `min_utilization_pct` utilization.
    pub fn is_active(vault: &VaultSnapshot, min_utilization_pct: f64) -> bool {
        if vault.borrow_amount() == 0.0 || vault.supply_amount() == 0.0 {
            return false;
        }
        vault
            .utilization()
            .is_some_and(|utilization| utilization >= min_utilization_pct)
    }

    /// Run one scan, in vault-then-candidate order.
    pub async fn scan(&self) -> Vec<LiquidationOpportunity> {
        self.scan_with_summary().await.0
    }

    #[instrument(skip(self))]
    pub async fn scan_with_summary(&self) -> (Vec<LiquidationOpportunity>, ScanSummary) {
        let started = Instant::now();
        let mut summary = ScanSummary::default();

        let vaults = match self.lend.list_vaults().await {
            Ok(vaults) => vaults,
            Err(e) => {
                error!(error = %e, "Error fetching vaults");
                return (Vec::new(), summary);
            }
        };
        summary.vaults = vaults.len();

        let active: Vec<&VaultSnapshot> = vaults
            .iter()
            .filter(|vault| Self::is_active(vault, self.config.min_utilization_pct))
            .collect();
        summary.skipped = vaults.len() - active.len();

        debug!(
            active = active.len(),
            skipped = summary.skipped,
            "Scanning active vaults sequentially"
        );

        let mut opportunities = Vec::new();
        let delay = self.config.delay_between_vaults();

        for (index, vault) in active.iter().enumerate() {
            let rpc = self.pool.next();

            match self.lend.liquidation_candidates(vault.id, rpc.as_ref()).await {
                Ok(candidates) => {
                    summary.scanned += 1;
                    for candidate in &candidates {
                        if let Some(opportunity) = LiquidationOpportunity::evaluate(vault, candidate) {
                            info!(
                                vault_id = vault.id,
                                pay = format!(
                                    "{:.4} {}",
                                    opportunity.debt_amount_ui, opportunity.debt_symbol
                                ),
                                get = format!(
                                    "{:.4} {}",
                                    opportunity.collateral_amount_ui, opportunity.collateral_symbol
                                ),
                                profit = format!("${:.2}", opportunity.estimated_profit_usd),
                                "Found liquidation"
                            );
                            opportunities.push(opportunity);
                        }
                    }
                }
                Err(e) if e.is_rate_limited() => {
                    summary.rate_limited += 1;
                    warn!(
                        vault_id = vault.id,
                        rpc = rpc.url(),
                        penalty_ms = self.config.rate_limit_penalty_ms,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(self.config.rate_limit_penalty()).await;
                }
                Err(e) => {
                    summary.failed += 1;
                    debug!(vault_id = vault.id, error = %e, "Error checking vault");
                }
            }

            if index + 1 < active.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        summary.opportunities = opportunities.len();
        let elapsed = started.elapsed();

        if opportunities.is_empty() {
            debug!(
                elapsed_s = format!("{:.2}", elapsed.as_secs_f64()),
                scanned = summary.scanned,
                rate_limited = summary.rate_limited,
                failed = summary.failed,
                "Scan complete, no liquidations found"
            );
        } else {
            info!(
                elapsed_s = format!("{:.2}", elapsed.as_secs_f64()),
                scanned = summary.scanned,
                rate_limited = summary.rate_limited,
                failed = summary.failed,
                opportunities = summary.opportunities,
                "Scan complete"
            );
        }

        (opportunities, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::fixtures::{candidate, vault};
    use crate::testing::{pool_of, CandidatesReply, MockLend, MockRpc};
    use std::time::Duration;

    fn config() -> ScannerConfig {
        ScannerConfig {
            delay_between_vaults_ms: 300,
            rate_limit_penalty_ms: 2_000,
            ..Default::default()
        }
    }

    fn scanner(lend: Arc<MockLend>, endpoints: usize) -> OpportunityScanner {
        let rpcs = (0..endpoints)
            .map(|i| Arc::new(MockRpc::new(&format!("http://rpc-{i}"))))
            .collect();
        OpportunityScanner::new(lend, pool_of(rpcs, 9), config())
    }

    #[test]
    fn test_activity_filter() {
        // Zero supply excludes regardless of borrow
        assert!(!OpportunityScanner::is_active(&vault(1, 5_000_000, 0), 5.0));
        assert!(!OpportunityScanner::is_active(&vault(1, 0, 100_000_000), 5.0));

        // 5% is inclusive
        assert!(OpportunityScanner::is_active(&vault(1, 5_000_000, 100_000_000), 5.0));
        assert!(!OpportunityScanner::is_active(&vault(1, 4_999_000, 100_000_000), 5.0));
        assert!(OpportunityScanner::is_active(&vault(1, 90_000_000, 100_000_000), 5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_profitable_candidates_in_order() {
        let lend = Arc::new(
            MockLend::new(vec![vault(1, 50_000_000, 100_000_000), vault(2, 50_000_000, 100_000_000)])
                .with_candidates(
                    1,
                    CandidatesReply::Found(vec![
                        candidate(50_000_000, 80_000_000),
                        candidate(50_000_000, 40_000_000),
                    ]),
                )
                .with_candidates(
                    2,
                    CandidatesReply::Found(vec![
                        candidate(1_000_000, 2_000_000),
                        candidate(1_000_000, 1_000_000),
                    ]),
                ),
        );

        let (opportunities, summary) = scanner(lend, 1).scan_with_summary().await;

        let profits: Vec<f64> = opportunities.iter().map(|o| o.estimated_profit_usd).collect();
        assert_eq!(profits.len(), 2);
        assert!((profits[0] - 30.0).abs() < 1e-9);
        assert!((profits[1] - 1.0).abs() < 1e-9);
        assert!(opportunities.iter().all(|o| o.estimated_profit_usd > 0.0));
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.opportunities, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_vault_is_skipped() {
        let vault_a = vault(1, 50_000_000, 100_000_000);
        let vault_b = vault(2, 50_000_000, 100_000_000);
        let lend = Arc::new(
            MockLend::new(vec![vault_a, vault_b.clone()])
                .with_candidates(1, CandidatesReply::RateLimited)
                .with_candidates(2, CandidatesReply::Found(vec![candidate(50_000_000, 80_000_000)])),
        );

        let started = tokio::time::Instant::now();
        let (opportunities, summary) = scanner(lend.clone(), 1).scan_with_summary().await;

        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].vault, vault_b.address);
        assert_eq!(summary.rate_limited, 1);
        assert_eq!(lend.queried_vaults(), vec![1, 2]);
        // Penalty plus one inter-vault delay
        assert!(started.elapsed() >= Duration::from_millis(2_300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_vault_error_does_not_abort_scan() {
        let lend = Arc::new(
            MockLend::new(vec![
                vault(1, 50_000_000, 100_000_000),
                vault(2, 50_000_000, 100_000_000),
            ])
            .with_candidates(1, CandidatesReply::Fails)
            .with_candidates(2, CandidatesReply::Found(vec![candidate(50_000_000, 80_000_000)])),
        );

        let (opportunities, summary) = scanner(lend, 1).scan_with_summary().await;

        assert_eq!(opportunities.len(), 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.scanned, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_vaults_not_queried() {
        let lend = Arc::new(MockLend::new(vec![
            vault(1, 0, 100_000_000),
            vault(2, 50_000_000, 0),
            vault(3, 1_000_000, 100_000_000),
            vault(4, 50_000_000, 100_000_000),
        ]));

        let (_, summary) = scanner(lend.clone(), 1).scan_with_summary().await;

        assert_eq!(lend.queried_vaults(), vec![4]);
        assert_eq!(summary.skipped, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_vaults_not_after_last() {
        let vaults = (1..=3).map(|id| vault(id, 50_000_000, 100_000_000)).collect();
        let lend = Arc::new(MockLend::new(vaults));

        let started = tokio::time::Instant::now();
        scanner(lend, 1).scan().await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_and_failed_vault_list() {
        let empty = Arc::new(MockLend::new(Vec::new()));
        assert!(scanner(empty, 1).scan().await.is_empty());

        let failing = MockLend::new(Vec::new());
        *failing.vaults.lock() = None;
        assert!(scanner(Arc::new(failing), 1).scan().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queries_rotate_through_pool() {
        let vaults = (1..=4).map(|id| vault(id, 50_000_000, 100_000_000)).collect();
        let lend = Arc::new(MockLend::new(vaults));
        let rpcs = vec![
            Arc::new(MockRpc::new("http://rpc-0")),
            Arc::new(MockRpc::new("http://rpc-1")),
        ];
        let scanner = OpportunityScanner::new(lend.clone(), pool_of(rpcs, 1), config());

        scanner.scan().await;

        let urls: Vec<String> = lend
            .candidate_calls
            .lock()
            .iter()
            .map(|(_, url)| url.clone())
            .collect();
        assert_eq!(urls, vec!["http://rpc-0", "http://rpc-1", "http://rpc-0", "http://rpc-1"]);
    }
}
