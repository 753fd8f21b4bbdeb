//! In-crate mocks of the chain, Lend and notification seams.

use async_trait::async_trait;
use liquidator_api::{
    ApiError, LendProtocol, LiquidateRequest, LiquidationCandidate, LiquidationInstructions,
    VaultSnapshot,
};
use liquidator_chain::{ChainError, RpcPool, SendOptions, SolanaRpc};
use parking_lot::Mutex;
use solana_sdk::clock::Slot;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::collections::HashMap;
use std::sync::Arc;

use crate::liquidator::LiquidationResult;
use crate::notifier::Notifier;
use crate::opportunity::LiquidationOpportunity;
use crate::stats::LiquidationStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    Expired,
}

pub struct MockRpc {
    url: String,
    pub send_fails: bool,
    pub confirm: ConfirmOutcome,
    pub sent: Mutex<Vec<(VersionedTransaction, SendOptions)>>,
    pub confirmed_with: Mutex<Vec<(Signature, u64, CommitmentConfig)>>,
}

impl MockRpc {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            send_fails: false,
            confirm: ConfirmOutcome::Confirmed,
            sent: Mutex::new(Vec::new()),
            confirmed_with: Mutex::new(Vec::new()),
        }
    }
}

pub const MOCK_LAST_VALID_BLOCK_HEIGHT: u64 = 1_000;

#[async_trait]
impl SolanaRpc for MockRpc {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_slot(&self) -> liquidator_chain::Result<Slot> {
        Ok(42)
    }

    async fn get_latest_blockhash(&self) -> liquidator_chain::Result<(Hash, u64)> {
        Ok((Hash::new_unique(), MOCK_LAST_VALID_BLOCK_HEIGHT))
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: SendOptions,
    ) -> liquidator_chain::Result<Signature> {
        if self.send_fails {
            return Err(ChainError::RateLimited {
                endpoint: self.url.clone(),
            });
        }
        self.sent.lock().push((transaction.clone(), options));
        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _blockhash: &Hash,
        last_valid_block_height: u64,
        commitment: CommitmentConfig,
    ) -> liquidator_chain::Result<()> {
        self.confirmed_with
            .lock()
            .push((*signature, last_valid_block_height, commitment));
        match self.confirm {
            ConfirmOutcome::Confirmed => Ok(()),
            ConfirmOutcome::Expired => Err(ChainError::BlockhashExpired {
                last_valid_block_height,
            }),
        }
    }
}

pub fn pool_of(rpcs: Vec<Arc<MockRpc>>, budget: u32) -> Arc<RpcPool> {
    let endpoints = rpcs
        .into_iter()
        .map(|rpc| rpc as Arc<dyn SolanaRpc>)
        .collect();
    Arc::new(RpcPool::new(endpoints, budget).unwrap())
}

pub enum CandidatesReply {
    Found(Vec<LiquidationCandidate>),
    RateLimited,
    Fails,
}

pub struct MockLend {
    /// `None` makes the vault list request fail
    pub vaults: Mutex<Option<Vec<VaultSnapshot>>>,
    /// Replaces `vaults` once the first listing has been served
    pub next_vaults: Mutex<Option<Vec<VaultSnapshot>>>,
    pub candidates: Mutex<HashMap<u64, CandidatesReply>>,
    pub instructions_fail: bool,
    /// (vault id, rpc url) per candidate query
    pub candidate_calls: Mutex<Vec<(u64, String)>>,
    pub liquidate_requests: Mutex<Vec<LiquidateRequest>>,
}

impl MockLend {
    pub fn new(vaults: Vec<VaultSnapshot>) -> Self {
        Self {
            vaults: Mutex::new(Some(vaults)),
            next_vaults: Mutex::new(None),
            candidates: Mutex::new(HashMap::new()),
            instructions_fail: false,
            candidate_calls: Mutex::new(Vec::new()),
            liquidate_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_candidates(self, vault_id: u64, reply: CandidatesReply) -> Self {
        self.candidates.lock().insert(vault_id, reply);
        self
    }

    /// Serve `vaults` for every listing after the first.
    pub fn then_vaults(self, vaults: Vec<VaultSnapshot>) -> Self {
        *self.next_vaults.lock() = Some(vaults);
        self
    }

    pub fn queried_vaults(&self) -> Vec<u64> {
        self.candidate_calls.lock().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl LendProtocol for MockLend {
    async fn list_vaults(&self) -> liquidator_api::Result<Vec<VaultSnapshot>> {
        let mut vaults = self.vaults.lock();
        let listing = vaults.clone();
        if let Some(next) = self.next_vaults.lock().take() {
            *vaults = Some(next);
        }
        listing.ok_or_else(|| ApiError::invalid("vault list unavailable"))
    }

    async fn liquidation_candidates(
        &self,
        vault_id: u64,
        rpc: &dyn SolanaRpc,
    ) -> liquidator_api::Result<Vec<LiquidationCandidate>> {
        self.candidate_calls
            .lock()
            .push((vault_id, rpc.url().to_string()));

        match self.candidates.lock().get(&vault_id) {
            Some(CandidatesReply::Found(candidates)) => Ok(candidates.clone()),
            Some(CandidatesReply::RateLimited) => Err(ApiError::RateLimited {
                url: format!("mock://vaults/{vault_id}"),
            }),
            Some(CandidatesReply::Fails) => Err(ApiError::Status {
                url: format!("mock://vaults/{vault_id}"),
                status: 500,
                body: "internal error".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn liquidation_instructions(
        &self,
        request: &LiquidateRequest,
    ) -> liquidator_api::Result<LiquidationInstructions> {
        self.liquidate_requests.lock().push(request.clone());
        if self.instructions_fail {
            return Err(ApiError::invalid("liquidation response has no instructions"));
        }

        Ok(LiquidationInstructions {
            instructions: vec![Instruction {
                program_id: Pubkey::new_unique(),
                accounts: vec![
                    AccountMeta::new(request.signer, true),
                    AccountMeta::new(Pubkey::new_unique(), false),
                ],
                data: vec![7],
            }],
            lookup_tables: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(Pubkey, f64),
    Opportunity(f64),
    Succeeded(String),
    Failed(String),
    Stopped(u64),
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<Event>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn bot_started(&self, wallet: &Pubkey, min_profit_usd: f64) {
        self.events.lock().push(Event::Started(*wallet, min_profit_usd));
    }

    async fn opportunity_found(&self, opportunity: &LiquidationOpportunity) {
        self.events
            .lock()
            .push(Event::Opportunity(opportunity.estimated_profit_usd));
    }

    async fn liquidation_succeeded(
        &self,
        result: &LiquidationResult,
        _opportunity: &LiquidationOpportunity,
    ) {
        self.events
            .lock()
            .push(Event::Succeeded(result.signature.clone().unwrap_or_default()));
    }

    async fn liquidation_failed(
        &self,
        result: &LiquidationResult,
        _opportunity: &LiquidationOpportunity,
    ) {
        self.events
            .lock()
            .push(Event::Failed(result.error.clone().unwrap_or_default()));
    }

    async fn bot_stopped(&self, stats: &LiquidationStats) {
        self.events.lock().push(Event::Stopped(stats.total_attempts));
    }
}
