//! Configuration management with profile support.
//!
//! Provides centralized configuration for all bot parameters with
//! support for different profiles (testing, production, aggressive),
//! TOML files and environment overrides.

use anyhow::{bail, Context};
use liquidator_api::DEFAULT_LEND_API_URL;
use liquidator_chain::{ComputeBudget, DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_COMPUTE_UNIT_PRICE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::env::{expand_env, parse_bool, split_list};
use super::wallet::WalletConfig;

/// Main configuration structure containing all bot parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Verbose (debug) logging
    #[serde(default)]
    pub verbose: bool,

    /// RPC endpoints and their request budget
    #[serde(default)]
    pub rpc: RpcSettings,

    /// Scan timing and vault filtering
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Liquidation execution parameters
    #[serde(default)]
    pub liquidation: LiquidationConfig,

    /// Compute budget attached to every liquidation
    #[serde(default)]
    pub compute_budget: ComputeBudgetConfig,

    /// Lend API location
    #[serde(default)]
    pub lend: LendConfig,

    /// Telegram notifications
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Signing credential
    #[serde(default)]
    pub wallet: WalletConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    /// Endpoint URLs, in rotation order. `${VAR}` patterns are expanded.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Consecutive requests an endpoint serves before rotation moves on
    #[serde(default = "default_max_requests")]
    pub max_requests_per_endpoint: u32,
}

fn default_max_requests() -> u32 {
    9
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            max_requests_per_endpoint: default_max_requests(),
        }
    }
}

/// Scanner timing and vault filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Pause between consecutive vault queries (milliseconds)
    #[serde(default = "default_delay_between_vaults")]
    pub delay_between_vaults_ms: u64,

    /// Pause between scan cycles (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Extra pause after a rate-limited vault query (milliseconds)
    #[serde(default = "default_rate_limit_penalty")]
    pub rate_limit_penalty_ms: u64,

    /// Vaults below this utilization (percent) are not scanned
    #[serde(default = "default_min_utilization")]
    pub min_utilization_pct: f64,
}

fn default_delay_between_vaults() -> u64 {
    300
}
fn default_poll_interval() -> u64 {
    60_000
}
fn default_rate_limit_penalty() -> u64 {
    2_000
}
fn default_min_utilization() -> f64 {
    5.0
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            delay_between_vaults_ms: default_delay_between_vaults(),
            poll_interval_ms: default_poll_interval(),
            rate_limit_penalty_ms: default_rate_limit_penalty(),
            min_utilization_pct: default_min_utilization(),
        }
    }
}

impl ScannerConfig {
    pub fn delay_between_vaults(&self) -> Duration {
        Duration::from_millis(self.delay_between_vaults_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn rate_limit_penalty(&self) -> Duration {
        Duration::from_millis(self.rate_limit_penalty_ms)
    }
}

/// Liquidation execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Minimum estimated profit USD to execute a liquidation
    #[serde(default = "default_min_profit")]
    pub min_profit_usd: f64,

    /// Retries the RPC node performs while forwarding a transaction
    #[serde(default = "default_send_retries")]
    pub max_send_retries: usize,

    /// Skip the preflight simulation on submit
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_min_profit() -> f64 {
    1.0
}
fn default_send_retries() -> usize {
    3
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            min_profit_usd: default_min_profit(),
            max_send_retries: default_send_retries(),
            skip_preflight: false,
        }
    }
}

/// Compute budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeBudgetConfig {
    #[serde(default = "default_unit_limit")]
    pub unit_limit: u32,

    /// Priority fee (micro-lamports per compute unit)
    #[serde(default = "default_unit_price")]
    pub unit_price_micro_lamports: u64,
}

fn default_unit_limit() -> u32 {
    DEFAULT_COMPUTE_UNIT_LIMIT
}
fn default_unit_price() -> u64 {
    DEFAULT_COMPUTE_UNIT_PRICE
}

impl Default for ComputeBudgetConfig {
    fn default() -> Self {
        Self {
            unit_limit: default_unit_limit(),
            unit_price_micro_lamports: default_unit_price(),
        }
    }
}

impl ComputeBudgetConfig {
    pub fn budget(&self) -> ComputeBudget {
        ComputeBudget {
            unit_limit: self.unit_limit,
            unit_price_micro_lamports: self.unit_price_micro_lamports,
        }
    }
}

/// Lend API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendConfig {
    #[serde(default = "default_lend_api_url")]
    pub api_url: String,
}

fn default_lend_api_url() -> String {
    DEFAULT_LEND_API_URL.to_string()
}

impl Default for LendConfig {
    fn default() -> Self {
        Self {
            api_url: default_lend_api_url(),
        }
    }
}

/// Telegram notification settings. Both fields are required to enable it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            verbose: false,
            rpc: RpcSettings::default(),
            scanner: ScannerConfig::default(),
            liquidation: LiquidationConfig::default(),
            compute_budget: ComputeBudgetConfig::default(),
            lend: LendConfig::default(),
            telegram: TelegramConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("failed to parse {path}"))?;
        Ok(config)
    }

    /// Create a testing profile: any profit, slow polling.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            verbose: true,
            scanner: ScannerConfig {
                delay_between_vaults_ms: 1_000,
                poll_interval_ms: 120_000,
                ..Default::default()
            },
            liquidation: LiquidationConfig {
                min_profit_usd: 0.0, // No minimum profit for testing
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a production profile with conservative settings.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            liquidation: LiquidationConfig {
                min_profit_usd: 5.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create an aggressive profile for maximum speed.
    pub fn aggressive() -> Self {
        Self {
            profile: "aggressive".to_string(),
            scanner: ScannerConfig {
                delay_between_vaults_ms: 100,
                poll_interval_ms: 10_000,
                rate_limit_penalty_ms: 1_000,
                ..Default::default()
            },
            liquidation: LiquidationConfig {
                min_profit_usd: 0.5,
                ..Default::default()
            },
            compute_budget: ComputeBudgetConfig {
                unit_price_micro_lamports: 500_000, // Higher fee for priority
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Get profile from environment variable BOT_PROFILE, or default.
    /// Supported values: testing, production, aggressive
    pub fn from_profile_env() -> Self {
        let profile = std::env::var("BOT_PROFILE").unwrap_or_else(|_| "default".to_string());
        match profile.to_lowercase().as_str() {
            "testing" | "test" => Self::testing(),
            "production" | "prod" => Self::production(),
            "aggressive" | "aggro" => Self::aggressive(),
            _ => Self::default(),
        }
    }

    /// Resolve the full configuration: `BOT_CONFIG` file or `BOT_PROFILE`
    /// profile, then environment overrides, then `${VAR}` expansion.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = match std::env::var("BOT_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::from_profile_env(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.expand_env_vars();
        Ok(config)
    }

    /// Apply overrides from `lookup` (environment variable names).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(list) = get("RPC_ENDPOINTS") {
            self.rpc.endpoints = split_list(&list);
        } else if let Some(single) = get("RPC_ENDPOINT") {
            if self.rpc.endpoints.is_empty() {
                self.rpc.endpoints = vec![single.trim().to_string()];
            }
        }

        if let Some(value) = get("MAX_REQUESTS_PER_RPC") {
            self.rpc.max_requests_per_endpoint = parse_var("MAX_REQUESTS_PER_RPC", &value)?;
        }
        if let Some(value) = get("MIN_PROFIT_USD") {
            self.liquidation.min_profit_usd = parse_var("MIN_PROFIT_USD", &value)?;
        }
        if let Some(value) = get("DELAY_BETWEEN_VAULTS_MS") {
            self.scanner.delay_between_vaults_ms = parse_var("DELAY_BETWEEN_VAULTS_MS", &value)?;
        }
        if let Some(value) = get("POLL_INTERVAL_MS") {
            self.scanner.poll_interval_ms = parse_var("POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = get("VERBOSE") {
            self.verbose = parse_bool(&value);
        }
        if let Some(url) = get("LEND_API_URL") {
            self.lend.api_url = url;
        }
        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(key) = get("PRIVATE_KEY") {
            self.wallet.private_key = Some(key);
        }
        if let Some(path) = get("WALLET_PATH") {
            self.wallet.keypair_path = Some(path);
        }

        Ok(())
    }

    /// Expand environment variables in endpoint URLs.
    pub fn expand_env_vars(&mut self) {
        for endpoint in &mut self.rpc.endpoints {
            *endpoint = expand_env(endpoint);
        }
        self.lend.api_url = expand_env(&self.lend.api_url);
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.endpoints.is_empty() {
            bail!("no RPC endpoints configured (set RPC_ENDPOINTS or RPC_ENDPOINT)");
        }
        if let Some(endpoint) = self.rpc.endpoints.iter().find(|e| e.contains("${")) {
            bail!("RPC endpoint {endpoint} references an unset environment variable");
        }
        if self.rpc.max_requests_per_endpoint == 0 {
            bail!("max_requests_per_endpoint must be at least 1");
        }
        let min_profit = self.liquidation.min_profit_usd;
        if !min_profit.is_finite() || min_profit < 0.0 {
            bail!("min_profit_usd must be a non-negative number, got {min_profit}");
        }
        if !self.wallet.has_credential() {
            bail!("no signing credential configured (set PRIVATE_KEY or WALLET_PATH)");
        }
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, verbose = self.verbose, "Bot configuration loaded");
        tracing::info!(
            endpoints = self.rpc.endpoints.len(),
            max_requests_per_endpoint = self.rpc.max_requests_per_endpoint,
            "RPC settings"
        );
        tracing::info!(
            delay_between_vaults_ms = self.scanner.delay_between_vaults_ms,
            poll_interval_ms = self.scanner.poll_interval_ms,
            rate_limit_penalty_ms = self.scanner.rate_limit_penalty_ms,
            min_utilization_pct = self.scanner.min_utilization_pct,
            "Scanner timing"
        );
        tracing::info!(
            min_profit = self.liquidation.min_profit_usd,
            max_send_retries = self.liquidation.max_send_retries,
            cu_limit = self.compute_budget.unit_limit,
            cu_price = self.compute_budget.unit_price_micro_lamports,
            "Liquidation parameters"
        );
        tracing::info!(
            lend_api = %self.lend.api_url,
            telegram = self.telegram.is_enabled(),
            "Integrations"
        );
    }
}

fn parse_var<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}
