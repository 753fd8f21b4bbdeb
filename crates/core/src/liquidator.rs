//! Liquidation executor for on-chain liquidation transactions.

use anyhow::{anyhow, Result};
use liquidator_api::{LendProtocol, LiquidateRequest};
use liquidator_chain::{build_versioned_transaction, ComputeBudget, RpcPool, SendOptions};
use serde::Serialize;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::opportunity::LiquidationOpportunity;

/// Result of a liquidation execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidationResult {
    pub success: bool,
    /// Transaction signature (base58), on success
    pub signature: Option<String>,
    /// Realized profit, the pre-execution estimate, on success
    pub profit_usd: Option<f64>,
    /// Failure reason
    pub error: Option<String>,
}

impl LiquidationResult {
    pub fn succeeded(signature: String, profit_usd: f64) -> Self {
        Self {
            success: true,
            signature: Some(signature),
            profit_usd: Some(profit_usd),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            signature: None,
            profit_usd: None,
            error: Some(error.into()),
        }
    }
}

/// Liquidation executor.
pub struct LiquidationExecutor {
    /// Lend protocol client
    lend: Arc<dyn LendProtocol>,

    /// Pooled RPC connections
    pool: Arc<RpcPool>,

    /// Signer, fee payer and collateral recipient
    payer: Arc<Keypair>,

    compute_budget: ComputeBudget,

    send_options: SendOptions,
}

impl LiquidationExecutor {
    /// Create a new executor with default compute budget and send options.
    pub fn new(lend: Arc<dyn LendProtocol>, pool: Arc<RpcPool>, payer: Arc<Keypair>) -> Self {
        Self {
            lend,
            pool,
            payer,
            compute_budget: ComputeBudget::default(),
            send_options: SendOptions::default(),
        }
    }

    /// Set the compute budget.
    pub fn with_compute_budget(mut self, compute_budget: ComputeBudget) -> Self {
        self.compute_budget = compute_budget;
        self
    }

    /// Set submission options.
    pub fn with_send_options(mut self, send_options: SendOptions) -> Self {
        self.send_options = send_options;
        self
    }

    pub fn payer(&self) -> &Keypair {
        &self.payer
    }

    /// Execute one liquidation. Every failure becomes a failed result.
    #[instrument(skip(self, opportunity), fields(vault = %opportunity.vault, obligation = %opportunity.obligation))]
    pub async fn execute(&self, opportunity: &LiquidationOpportunity) -> LiquidationResult {
        let started = Instant::now();

        match self.submit(opportunity).await {
            Ok(signature) => {
                info!(
                    %signature,
                    profit = format!("${:.2}", opportunity.estimated_profit_usd),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Liquidation confirmed"
                );
                LiquidationResult::succeeded(signature.to_string(), opportunity.estimated_profit_usd)
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(
                    error = %message,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Liquidation execution error"
                );
                LiquidationResult::failed(message)
            }
        }
    }

    async fn submit(&self, opportunity: &LiquidationOpportunity) -> Result<Signature> {
        // Vault ids are resolved from a fresh listing, matched on address
        let vaults = self.lend.list_vaults().await?;
        let vault = vaults
            .iter()
            .find(|vault| vault.address == opportunity.vault)
            .ok_or_else(|| anyhow!("Vault not found: {}", opportunity.vault))?;

        debug!(vault_id = vault.id, "Building liquidation instruction");
        let signer = self.payer.pubkey();
        let request = LiquidateRequest {
            vault_id: vault.id,
            debt_amount: opportunity.debt_amount,
            signer,
            to: signer,
        };
        let built = self.lend.liquidation_instructions(&request).await?;

        let rpc = self.pool.next();
        let (blockhash, last_valid_block_height) = rpc.get_latest_blockhash().await?;

        let transaction = build_versioned_transaction(
            &self.payer,
            self.compute_budget,
            &built.instructions,
            &built.lookup_tables,
            blockhash,
        )?;

        debug!(rpc = rpc.url(), "Sending liquidation transaction");
        let signature = rpc.send_transaction(&transaction, self.send_options).await?;
        info!(%signature, rpc = rpc.url(), "Transaction sent");

        rpc.confirm_transaction(
            &signature,
            &blockhash,
            last_valid_block_height,
            CommitmentConfig::confirmed(),
        )
        .await?;

        Ok(signature)
    }
}
