//! Liquidator core logic.
//!
//! This crate provides the core liquidation bot functionality:
//! - Opportunity pricing from vault snapshots and liquidation candidates
//! - Sequential, rate-limit aware opportunity scanning
//! - Liquidation execution (instruction build, compute budget, submit, confirm)
//! - Statistics, notifications and the bot loop
//! - Profile-based configuration with environment overrides

mod bot;
pub mod config;
mod liquidator;
mod notifier;
mod opportunity;
mod scanner;
mod stats;

#[cfg(test)]
mod testing;

pub use bot::{CycleReport, LiquidationBot};
pub use config::BotConfig;
pub use liquidator::{LiquidationExecutor, LiquidationResult};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier};
pub use opportunity::LiquidationOpportunity;
pub use scanner::{OpportunityScanner, ScanSummary};
pub use stats::LiquidationStats;
