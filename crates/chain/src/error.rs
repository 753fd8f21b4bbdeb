//! Transport error classification.
//!
//! Callers branch on the variant, never on the message text: a provider
//! throttling response becomes [`ChainError::RateLimited`] here, once.

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use solana_sdk::message::CompileError;
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// HTTP status / JSON-RPC code providers use for throttling.
const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rate limited by {endpoint}")]
    RateLimited { endpoint: String },

    #[error("blockhash expired before confirmation (last valid block height {last_valid_block_height})")]
    BlockhashExpired { last_valid_block_height: u64 },

    #[error("transaction {signature} failed: {error}")]
    TransactionFailed {
        signature: String,
        error: TransactionError,
    },

    #[error("failed to compile message: {0}")]
    Compile(#[from] CompileError),

    #[error("failed to sign transaction: {0}")]
    Signing(#[from] SignerError),

    #[error("rpc error from {endpoint}: {source}")]
    Rpc {
        endpoint: String,
        #[source]
        source: Box<ClientError>,
    },

    #[error("rpc pool has no endpoints")]
    NoEndpoints,
}

impl ChainError {
    /// Classify a client error raised while talking to `endpoint`.
    pub fn from_client(endpoint: &str, err: ClientError) -> Self {
        if is_throttled(err.kind()) {
            return Self::RateLimited {
                endpoint: endpoint.to_string(),
            };
        }
        Self::Rpc {
            endpoint: endpoint.to_string(),
            source: Box::new(err),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

fn is_throttled(kind: &ClientErrorKind) -> bool {
    match kind {
        ClientErrorKind::Reqwest(e) => e
            .status()
            .is_some_and(|status| status.as_u16() == TOO_MANY_REQUESTS),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            *code == i64::from(TOO_MANY_REQUESTS)
        }
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_response_429_is_rate_limited() {
        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: 429,
            message: "Too many requests for a specific RPC call".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        }));

        let classified = ChainError::from_client("https://rpc.example", err);
        assert!(classified.is_rate_limited());
    }

    #[test]
    fn test_other_errors_are_not_rate_limited() {
        let err = ClientError::from(ClientErrorKind::Custom("Too Many Requests".to_string()));

        let classified = ChainError::from_client("https://rpc.example", err);
        assert!(!classified.is_rate_limited());
        assert!(classified.to_string().contains("rpc.example"));
    }
}
