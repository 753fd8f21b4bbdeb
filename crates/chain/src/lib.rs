//! Liquidator chain interaction layer.
//!
//! This crate provides:
//! - The `SolanaRpc` transport seam and its nonblocking RPC client adapter
//! - Structural error classification (rate limits, expired blockhashes)
//! - A rate-limited, rotating pool over several RPC endpoints
//! - Versioned transaction assembly with compute-budget instructions

mod error;
mod pool;
mod rpc;
mod transaction;

pub use error::{ChainError, Result};
pub use pool::{RpcEndpointState, RpcPool};
pub use rpc::{SendOptions, SolanaRpc, SolanaRpcClient};
pub use transaction::{
    build_versioned_transaction, ComputeBudget, DEFAULT_COMPUTE_UNIT_LIMIT,
    DEFAULT_COMPUTE_UNIT_PRICE,
};
