//! Runtime liquidation statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::liquidator::LiquidationResult;

/// In-memory liquidation counters.
///
/// `total_attempts == successful_liquidations + failed_liquidations` holds
/// after every [`record`](Self::record).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiquidationStats {
    pub total_attempts: u64,
    pub successful_liquidations: u64,
    pub failed_liquidations: u64,
    pub total_profit_usd: f64,
    pub last_liquidation_time: Option<DateTime<Utc>>,
}

impl LiquidationStats {
    /// Account for one executed liquidation.
    pub fn record(&mut self, result: &LiquidationResult) {
        self.total_attempts += 1;
        if result.success {
            self.successful_liquidations += 1;
            self.total_profit_usd += result.profit_usd.unwrap_or(0.0);
            self.last_liquidation_time = Some(Utc::now());
        } else {
            self.failed_liquidations += 1;
        }
    }

    /// Successful share of attempts, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.successful_liquidations as f64 * 100.0 / self.total_attempts as f64
    }

    /// Log the current counters.
    pub fn log(&self) {
        tracing::info!(
            attempts = self.total_attempts,
            successful = self.successful_liquidations,
            failed = self.failed_liquidations,
            success_rate = format!("{:.1}%", self.success_rate()),
            total_profit = format!("${:.2}", self.total_profit_usd),
            last_liquidation = ?self.last_liquidation_time,
            "Liquidation stats"
        );
    }

    /// One-line summary for notifications.
    pub fn summary(&self) -> String {
        format!(
            "attempts {} | ok {} | failed {} | success {:.1}% | profit ${:.2}",
            self.total_attempts,
            self.successful_liquidations,
            self.failed_liquidations,
            self.success_rate(),
            self.total_profit_usd
        )
    }
}
