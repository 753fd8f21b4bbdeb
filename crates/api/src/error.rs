//! Lend API error type.

use liquidator_chain::ChainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// True for throttling from either the Lend API or the RPC transport.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Chain(e) => e.is_rate_limited(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
