//! Versioned transaction assembly.
//!
//! Compute-budget instructions always lead the message, followed by the
//! protocol instructions in the order they were supplied.

use smallvec::SmallVec;
use solana_sdk::address_lookup_table_account::AddressLookupTableAccount;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use tracing::debug;

use crate::error::Result;

/// Default compute unit limit for a liquidation.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Default priority fee in micro-lamports per compute unit.
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 100_000;

/// Compute budget applied to every liquidation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub unit_price_micro_lamports: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            unit_price_micro_lamports: DEFAULT_COMPUTE_UNIT_PRICE,
        }
    }
}

impl ComputeBudget {
    /// The limit and price instructions, in that order.
    pub fn instructions(&self) -> [Instruction; 2] {
        [
            ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(self.unit_price_micro_lamports),
        ]
    }
}

/// Compile and sign a v0 transaction paid for by `payer`.
pub fn build_versioned_transaction(
    payer: &Keypair,
    compute_budget: ComputeBudget,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
    recent_blockhash: Hash,
) -> Result<VersionedTransaction> {
    let mut all: SmallVec<[Instruction; 8]> = SmallVec::with_capacity(instructions.len() + 2);
    all.extend(compute_budget.instructions());
    all.extend(instructions.iter().cloned());

    let message = v0::Message::try_compile(&payer.pubkey(), &all, lookup_tables, recent_blockhash)?;
    let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])?;

    debug!(
        instructions = all.len(),
        lookup_tables = lookup_tables.len(),
        %recent_blockhash,
        "Transaction built"
    );

    Ok(transaction)
}
