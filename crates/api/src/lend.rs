//! Lend protocol client.
//!
//! [`LendProtocol`] is what the scanner and executor consume; [`LendApiClient`]
//! implements it against the Lend borrow HTTP API.

use async_trait::async_trait;
use liquidator_chain::SolanaRpc;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ApiError, Result};
use crate::types::{
    decode_candidates, decode_liquidate_response, decode_vaults, LiquidateRequest,
    LiquidationCandidate, LiquidationInstructions, VaultSnapshot,
};

/// Default Lend API base URL.
pub const DEFAULT_LEND_API_URL: &str = "https://api.jup.ag/lend/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lend protocol operations used by the bot.
#[async_trait]
pub trait LendProtocol: Send + Sync {
    /// All vaults with current aggregate state.
    async fn list_vaults(&self) -> Result<Vec<VaultSnapshot>>;

    /// Liquidatable positions of one vault, read through `rpc`.
    async fn liquidation_candidates(
        &self,
        vault_id: u64,
        rpc: &dyn SolanaRpc,
    ) -> Result<Vec<LiquidationCandidate>>;

    /// Instructions (and lookup tables) that liquidate `request.debt_amount`.
    async fn liquidation_instructions(
        &self,
        request: &LiquidateRequest,
    ) -> Result<LiquidationInstructions>;
}

/// HTTP client for the Lend borrow API.
#[derive(Debug, Clone)]
pub struct LendApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl LendApiClient {
    /// Create a client against the default API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_LEND_API_URL)
    }

    /// Create a client with custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json(&self, url: &str, response: reqwest::Response) -> Result<serde_json::Value> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited { url: url.to_string() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl LendProtocol for LendApiClient {
    #[instrument(skip(self))]
    async fn list_vaults(&self) -> Result<Vec<VaultSnapshot>> {
        let url = format!("{}/borrow/vaults", self.base_url);

        let response = self.client.get(&url).send().await?;
        let vaults = decode_vaults(self.read_json(&url, response).await?)?;

        debug!(vaults = vaults.len(), "Fetched vaults");

        Ok(vaults)
    }

    #[instrument(skip(self, rpc), fields(rpc = rpc.url()))]
    async fn liquidation_candidates(
        &self,
        vault_id: u64,
        rpc: &dyn SolanaRpc,
    ) -> Result<Vec<LiquidationCandidate>> {
        let min_context_slot = rpc.get_slot().await?;
        let url = format!("{}/borrow/vaults/{}/liquidations", self.base_url, vault_id);

        let response = self
            .client
            .get(&url)
            .query(&[("minContextSlot", min_context_slot.to_string())])
            .send()
            .await?;
        let candidates = decode_candidates(self.read_json(&url, response).await?)?;

        debug!(candidates = candidates.len(), min_context_slot, "Fetched liquidation candidates");

        Ok(candidates)
    }

    #[instrument(skip(self, request), fields(vault_id = request.vault_id))]
    async fn liquidation_instructions(
        &self,
        request: &LiquidateRequest,
    ) -> Result<LiquidationInstructions> {
        let url = format!("{}/borrow/liquidate", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;
        let built = decode_liquidate_response(self.read_json(&url, response).await?)?;

        debug!(
            instructions = built.instructions.len(),
            lookup_tables = built.lookup_tables.len(),
            "Built liquidation instructions"
        );

        Ok(built)
    }
}
