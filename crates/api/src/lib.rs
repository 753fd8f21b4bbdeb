//! Lend protocol API client.
//!
//! This crate provides:
//! - Vault, candidate and instruction payload schemas with validating decode
//! - The `LendProtocol` seam and its HTTP implementation

mod error;
mod lend;
mod types;

pub use error::{ApiError, Result};
pub use lend::{LendApiClient, LendProtocol, DEFAULT_LEND_API_URL};
pub use types::{
    decode_candidates, decode_liquidate_response, decode_vaults, LiquidateRequest,
    LiquidationCandidate, LiquidationInstructions, TokenInfo, VaultSnapshot,
};
