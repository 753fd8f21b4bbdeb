//! Liquidation opportunities and their profit estimate.

use liquidator_api::{LiquidationCandidate, VaultSnapshot};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// A profitable liquidation found during one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidationOpportunity {
    /// Vault address, resolved to a vault id again at execution time
    pub vault: Pubkey,
    /// Position being liquidated (vault address when the API reports none)
    pub obligation: Pubkey,
    pub debt_mint: Pubkey,
    pub collateral_mint: Pubkey,
    pub debt_symbol: String,
    pub collateral_symbol: String,
    /// Raw debt repaid (borrow token base units)
    pub debt_amount: u128,
    /// Raw collateral received (supply token base units)
    pub collateral_amount: u128,
    /// Debt in whole tokens
    pub debt_amount_ui: f64,
    /// Collateral in whole tokens
    pub collateral_amount_ui: f64,
    pub debt_value_usd: f64,
    pub collateral_value_usd: f64,
    /// Collateral value minus debt value
    pub estimated_profit_usd: f64,
}

impl LiquidationOpportunity {
    /// Price `candidate` against `vault`. `None` unless the estimated profit
    /// is strictly positive.
    pub fn evaluate(vault: &VaultSnapshot, candidate: &LiquidationCandidate) -> Option<Self> {
        let debt_amount_ui = vault.borrow_token.to_human(candidate.amt_in);
        let collateral_amount_ui = vault.supply_token.to_human(candidate.amt_out);

        let debt_value_usd = debt_amount_ui * vault.borrow_token.price;
        let collateral_value_usd = collateral_amount_ui * vault.supply_token.price;
        let estimated_profit_usd = collateral_value_usd - debt_value_usd;

        if estimated_profit_usd <= 0.0 || !estimated_profit_usd.is_finite() {
            return None;
        }

        Some(Self {
            vault: vault.address,
            obligation: candidate.position.unwrap_or(vault.address),
            debt_mint: vault.borrow_token.address,
            collateral_mint: vault.supply_token.address,
            debt_symbol: vault.borrow_token.symbol.clone(),
            collateral_symbol: vault.supply_token.symbol.clone(),
            debt_amount: candidate.amt_in,
            collateral_amount: candidate.amt_out,
            debt_amount_ui,
            collateral_amount_ui,
            debt_value_usd,
            collateral_value_usd,
            estimated_profit_usd,
        })
    }
}
