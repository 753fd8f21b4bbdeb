//! Lend Vault Liquidation Bot
//!
//! Scans Lend borrow vaults for liquidatable positions and executes the
//! profitable ones.
//! Features:
//! - Rate-limited rotation across several Solana RPC endpoints
//! - Sequential vault scanning with rate-limit back-off
//! - Compute-budgeted v0 transactions with address lookup tables
//! - Telegram notifications

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_api::LendApiClient;
use liquidator_chain::{RpcPool, SendOptions};
use liquidator_core::{
    BotConfig, LiquidationBot, LiquidationExecutor, LogNotifier, Notifier, OpportunityScanner,
    TelegramNotifier,
};
use solana_sdk::signature::{Keypair, Signer};

#[tokio::main]
async fn main() -> Result<()> {
    // Print startup banner
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Use BOT_PROFILE (testing, production, aggressive) or BOT_CONFIG (TOML path)
    let config = BotConfig::from_env()?;

    init_tracing(config.verbose);
    config.log_config();

    // Missing endpoints or signing credential abort here
    config.validate()?;
    let payer = Arc::new(config.wallet.load_keypair().context("failed to load wallet")?);

    let mut bot = initialize_components(&config, payer)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, finishing current cycle"),
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("Press Ctrl+C to stop");
    let stats = bot.run(shutdown_rx).await;

    info!(summary = %stats.summary(), "Liquidation bot stopped");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,liquidator=debug,liquidator_core=debug,liquidator_api=debug,liquidator_chain=debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

fn initialize_components(config: &BotConfig, payer: Arc<Keypair>) -> Result<LiquidationBot> {
    info!("Initializing components...");

    let pool = Arc::new(
        RpcPool::from_urls(config.rpc.endpoints.as_slice(), config.rpc.max_requests_per_endpoint)
            .context("failed to create RPC pool")?,
    );

    let lend = Arc::new(
        LendApiClient::with_base_url(&config.lend.api_url)
            .context("failed to create Lend API client")?,
    );
    info!(url = lend.base_url(), "Lend API client initialized");

    let executor = LiquidationExecutor::new(lend.clone(), pool.clone(), payer.clone())
        .with_compute_budget(config.compute_budget.budget())
        .with_send_options(SendOptions {
            max_retries: config.liquidation.max_send_retries,
            skip_preflight: config.liquidation.skip_preflight,
        });

    let scanner = OpportunityScanner::new(lend, pool, config.scanner.clone());

    let notifier: Arc<dyn Notifier> = if config.telegram.is_enabled() {
        Arc::new(
            TelegramNotifier::from_config(&config.telegram)
                .context("failed to create Telegram notifier")?,
        )
    } else {
        info!("Telegram not configured, notifications go to the log only");
        Arc::new(LogNotifier)
    };

    info!(
        wallet = %payer.pubkey(),
        min_profit = format!("${:.2}", config.liquidation.min_profit_usd),
        rpc_endpoints = config.rpc.endpoints.len(),
        delay_between_vaults_ms = config.scanner.delay_between_vaults_ms,
        "Liquidation bot initialized"
    );

    Ok(LiquidationBot::new(
        scanner,
        executor,
        notifier,
        config.liquidation.min_profit_usd,
        config.scanner.poll_interval(),
    ))
}

fn print_banner() {
    println!(r#"
    ╦  ┌─┐┌┐┌┌┬┐  ╦  ┬┌─┐ ┬ ┬┬┌┬┐┌─┐┌┬┐┌─┐┬─┐
    ║  ├┤ │││ ││  ║  ││─┼┐│ ││ ││├─┤ │ │ │├┬┘
    ╩═╝└─┘┘└┘─┴┘  ╩═╝┴└─┘└└─┘┴─┴┘┴ ┴ ┴ └─┘┴└─
    Lend Vault Liquidator v0.1.0
    "#);
}
