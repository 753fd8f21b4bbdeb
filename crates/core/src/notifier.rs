//! Lifecycle and outcome notifications.
//!
//! Delivery is best-effort: a notifier logs its own failures and never
//! reports them to the bot loop.

use async_trait::async_trait;
use reqwest::Client;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::liquidator::LiquidationResult;
use crate::opportunity::LiquidationOpportunity;
use crate::stats::LiquidationStats;

/// Sink for bot events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn bot_started(&self, wallet: &Pubkey, min_profit_usd: f64);

    async fn opportunity_found(&self, opportunity: &LiquidationOpportunity);

    async fn liquidation_succeeded(
        &self,
        result: &LiquidationResult,
        opportunity: &LiquidationOpportunity,
    );

    async fn liquidation_failed(&self, result: &LiquidationResult, opportunity: &LiquidationOpportunity);

    async fn bot_stopped(&self, stats: &LiquidationStats);
}

/// Records events in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn bot_started(&self, wallet: &Pubkey, min_profit_usd: f64) {
        debug!(%wallet, min_profit_usd, "Notification: bot started");
    }

    async fn opportunity_found(&self, opportunity: &LiquidationOpportunity) {
        debug!(
            vault = %opportunity.vault,
            profit = opportunity.estimated_profit_usd,
            "Notification: opportunity found"
        );
    }

    async fn liquidation_succeeded(
        &self,
        result: &LiquidationResult,
        _opportunity: &LiquidationOpportunity,
    ) {
        debug!(signature = ?result.signature, "Notification: liquidation succeeded");
    }

    async fn liquidation_failed(&self, result: &LiquidationResult, _opportunity: &LiquidationOpportunity) {
        debug!(error = ?result.error, "Notification: liquidation failed");
    }

    async fn bot_stopped(&self, stats: &LiquidationStats) {
        debug!(attempts = stats.total_attempts, "Notification: bot stopped");
    }
}

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Upper bound on one delivery, so a stalled Telegram API cannot hold up the loop.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram Bot API notifier (HTML `sendMessage`).
pub struct TelegramNotifier {
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_url: String,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> anyhow::Result<Self> {
        Self::with_api_url(bot_token, chat_id, TELEGRAM_API_URL, SEND_TIMEOUT)
    }

    /// Notifier against a custom Bot API host with its own request timeout.
    pub fn with_api_url(
        bot_token: Option<String>,
        chat_id: Option<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            bot_token,
            chat_id,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &TelegramConfig) -> anyhow::Result<Self> {
        Self::new(config.bot_token.clone(), config.chat_id.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    /// Send `message`; failures are logged and dropped.
    pub async fn send(&self, message: &str) {
        if let Err(e) = self.send_message(message).await {
            warn!(error = %e, "Failed to send Telegram notification");
        }
    }

    async fn send_message(&self, message: &str) -> anyhow::Result<()> {
        let (bot_token, chat_id) = match (&self.bot_token, &self.chat_id) {
            (Some(token), Some(chat)) => (token, chat),
            _ => {
                debug!("Telegram notification skipped: bot token or chat ID not configured");
                return Ok(());
            }
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, bot_token);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("chat_id", chat_id.as_str()),
                ("text", message),
                ("parse_mode", "HTML"),
                ("disable_web_page_preview", "true"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {}: {}", status, error_text);
        }

        debug!("Telegram notification sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn bot_started(&self, wallet: &Pubkey, min_profit_usd: f64) {
        if self.is_enabled() {
            info!("Telegram notifications enabled");
        }
        self.send(&format_started(wallet, min_profit_usd)).await;
    }

    async fn opportunity_found(&self, opportunity: &LiquidationOpportunity) {
        self.send(&format_opportunity(opportunity)).await;
    }

    async fn liquidation_succeeded(
        &self,
        result: &LiquidationResult,
        opportunity: &LiquidationOpportunity,
    ) {
        self.send(&format_success(result, opportunity)).await;
    }

    async fn liquidation_failed(&self, result: &LiquidationResult, opportunity: &LiquidationOpportunity) {
        self.send(&format_failure(result, opportunity)).await;
    }

    async fn bot_stopped(&self, stats: &LiquidationStats) {
        self.send(&format_stopped(stats)).await;
    }
}

fn format_started(wallet: &Pubkey, min_profit_usd: f64) -> String {
    format!(
        "<b>🤖 Liquidation bot started</b>\n\n\
         Wallet: <code>{}</code>\n\
         Min profit: <b>${:.2}</b>",
        wallet, min_profit_usd
    )
}

fn format_opportunity(opportunity: &LiquidationOpportunity) -> String {
    format!(
        "<b>🔎 Liquidation opportunity</b>\n\n\
         Vault: <code>{}</code>\n\
         Pay: <b>{:.4} {}</b>\n\
         Get: <b>{:.4} {}</b>\n\
         Est. profit: <b>${:.2}</b>",
        opportunity.vault,
        opportunity.debt_amount_ui,
        escape_html(&opportunity.debt_symbol),
        opportunity.collateral_amount_ui,
        escape_html(&opportunity.collateral_symbol),
        opportunity.estimated_profit_usd
    )
}

fn format_success(result: &LiquidationResult, opportunity: &LiquidationOpportunity) -> String {
    let signature = result.signature.as_deref().unwrap_or("-");
    format!(
        "<b>✅ Liquidation succeeded</b>\n\n\
         Vault: <code>{}</code>\n\
         Profit: <b>${:.2}</b>\n\
         Tx: <a href=\"https://solscan.io/tx/{}\">{}</a>",
        opportunity.vault,
        result.profit_usd.unwrap_or(0.0),
        signature,
        signature
    )
}

fn format_failure(result: &LiquidationResult, opportunity: &LiquidationOpportunity) -> String {
    format!(
        "<b>❌ Liquidation failed</b>\n\n\
         Vault: <code>{}</code>\n\
         Est. profit: <b>${:.2}</b>\n\
         Error: <code>{}</code>",
        opportunity.vault,
        opportunity.estimated_profit_usd,
        escape_html(result.error.as_deref().unwrap_or("unknown error"))
    )
}

fn format_stopped(stats: &LiquidationStats) -> String {
    format!(
        "<b>🛑 Liquidation bot stopped</b>\n\n{}",
        escape_html(&stats.summary())
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
