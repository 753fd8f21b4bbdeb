//! Solana RPC transport.
//!
//! [`SolanaRpc`] is the seam the rest of the bot talks through; the pool hands
//! out `Arc<dyn SolanaRpc>` so scanners and executors never see the concrete
//! client. [`SolanaRpcClient`] wraps the nonblocking `solana-client` RPC client.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::clock::Slot;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{ChainError, Result};

/// Delay between signature status polls while awaiting confirmation.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Options for transaction submission.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Retries the RPC node performs while forwarding to the leader
    pub max_retries: usize,
    /// Skip the preflight simulation
    pub skip_preflight: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            skip_preflight: false,
        }
    }
}

/// Operations the bot needs from a single RPC endpoint.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Endpoint URL, for logging.
    fn url(&self) -> &str;

    /// Current slot at the client's commitment.
    async fn get_slot(&self) -> Result<Slot>;

    /// Latest blockhash and the last block height at which it stays valid.
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)>;

    /// Submit a signed transaction.
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: SendOptions,
    ) -> Result<Signature>;

    /// Wait until `signature` reaches `commitment`.
    ///
    /// Bounded by `last_valid_block_height`: once the chain passes it without
    /// the signature landing, returns [`ChainError::BlockhashExpired`].
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        blockhash: &Hash,
        last_valid_block_height: u64,
        commitment: CommitmentConfig,
    ) -> Result<()>;
}

/// Nonblocking RPC client bound to one endpoint.
pub struct SolanaRpcClient {
    url: String,
    client: RpcClient,
}

impl SolanaRpcClient {
    /// Create a client with `confirmed` commitment.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let client = RpcClient::new_with_commitment(url.clone(), CommitmentConfig::confirmed());
        Self { url, client }
    }

    /// Wrap an already configured client, e.g. one built over a custom sender.
    pub fn from_client(url: impl Into<String>, client: RpcClient) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    fn classify(&self, err: solana_client::client_error::ClientError) -> ChainError {
        ChainError::from_client(&self.url, err)
    }
}

#[async_trait]
impl SolanaRpc for SolanaRpcClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_slot(&self) -> Result<Slot> {
        self.client.get_slot().await.map_err(|e| self.classify(e))
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
        self.client
            .get_latest_blockhash_with_commitment(self.client.commitment())
            .await
            .map_err(|e| self.classify(e))
    }

    #[instrument(skip(self, transaction), fields(endpoint = %self.url))]
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: SendOptions,
    ) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(self.client.commitment().commitment),
            max_retries: Some(options.max_retries),
            ..Default::default()
        };

        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| self.classify(e))
    }

    #[instrument(skip(self, blockhash), fields(endpoint = %self.url))]
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        blockhash: &Hash,
        last_valid_block_height: u64,
        commitment: CommitmentConfig,
    ) -> Result<()> {
        debug!(%blockhash, last_valid_block_height, "Awaiting confirmation");

        loop {
            let statuses = match self.client.get_signature_statuses(&[*signature]).await {
                Ok(statuses) => statuses.value,
                Err(e) => {
                    // Throttled status polls fall through to the expiry check
                    let err = self.classify(e);
                    if !err.is_rate_limited() {
                        return Err(err);
                    }
                    warn!(%signature, "Rate limited while polling signature status");
                    Vec::new()
                }
            };

            if let Some(Some(status)) = statuses.first() {
                if let Some(error) = &status.err {
                    return Err(ChainError::TransactionFailed {
                        signature: signature.to_string(),
                        error: error.clone(),
                    });
                }
                if status.satisfies_commitment(commitment) {
                    return Ok(());
                }
            }

            let block_height = match self.client.get_block_height_with_commitment(commitment).await {
                Ok(height) => height,
                Err(e) => {
                    // Throttled height polls retry on the next tick
                    let err = self.classify(e);
                    if !err.is_rate_limited() {
                        return Err(err);
                    }
                    warn!(%signature, "Rate limited while polling block height");
                    tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
                    continue;
                }
            };

            if block_height > last_valid_block_height {
                return Err(ChainError::BlockhashExpired {
                    last_valid_block_height,
                });
            }

            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}
