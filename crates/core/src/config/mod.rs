//! Configuration system for the liquidation bot.
//!
//! This module provides:
//! - Bot runtime configuration (profiles, thresholds, timing)
//! - Environment overrides and `${VAR}` expansion
//! - Signing credential loading

mod bot;
mod env;
mod wallet;

pub use bot::{
    BotConfig, ComputeBudgetConfig, LendConfig, LiquidationConfig, RpcSettings, ScannerConfig,
    TelegramConfig,
};
pub use env::expand_env;
pub use wallet::WalletConfig;
