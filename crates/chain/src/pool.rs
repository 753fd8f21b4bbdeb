//! Rate-limited RPC connection pool.
//!
//! Endpoints are served in order, each for up to `max_requests_per_endpoint`
//! consecutive requests before rotation moves on. Completing a full pass over
//! every endpoint closes the window and resets all counters. With a budget of
//! one this is plain round-robin (`i mod N`).
//!
//! No health checks and no endpoint removal: a failing endpoint surfaces its
//! error to the caller, which owns retry/backoff policy.

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ChainError, Result};
use crate::rpc::{SolanaRpc, SolanaRpcClient};

/// Point-in-time view of one endpoint's rotation window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEndpointState {
    pub url: String,
    /// Requests served in the current window
    pub requests: u32,
}

/// Rotation cursor and per-endpoint counters.
#[derive(Debug)]
struct Rotation {
    current: usize,
    counts: SmallVec<[u32; 8]>,
}

/// Pool of RPC connections with per-endpoint request budgets.
pub struct RpcPool {
    endpoints: Vec<Arc<dyn SolanaRpc>>,
    max_requests_per_endpoint: u32,
    rotation: Mutex<Rotation>,
}

impl RpcPool {
    /// Create a pool over existing connections.
    pub fn new(endpoints: Vec<Arc<dyn SolanaRpc>>, max_requests_per_endpoint: u32) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ChainError::NoEndpoints);
        }

        let counts = SmallVec::from_elem(0, endpoints.len());
        Ok(Self {
            endpoints,
            max_requests_per_endpoint: max_requests_per_endpoint.max(1),
            rotation: Mutex::new(Rotation { current: 0, counts }),
        })
    }

    /// Create a pool of [`SolanaRpcClient`]s, one per URL, in the given order.
    pub fn from_urls<S: AsRef<str>>(urls: &[S], max_requests_per_endpoint: u32) -> Result<Self> {
        let endpoints: Vec<Arc<dyn SolanaRpc>> = urls
            .iter()
            .map(|url| Arc::new(SolanaRpcClient::new(url.as_ref())) as Arc<dyn SolanaRpc>)
            .collect();

        let pool = Self::new(endpoints, max_requests_per_endpoint)?;

        info!(
            endpoints = pool.len(),
            max_requests_per_endpoint = pool.max_requests_per_endpoint,
            "RPC pool initialized"
        );
        for (index, endpoint) in pool.endpoints.iter().enumerate() {
            info!(index, url = endpoint.url(), "RPC endpoint");
        }

        Ok(pool)
    }

    /// Next connection in rotation.
    pub fn next(&self) -> Arc<dyn SolanaRpc> {
        let mut rotation = self.rotation.lock();

        if rotation.counts[rotation.current] >= self.max_requests_per_endpoint {
            rotation.current = (rotation.current + 1) % self.endpoints.len();

            if rotation.current == 0 {
                rotation.counts.iter_mut().for_each(|count| *count = 0);
                debug!("RPC pool window reset");
            }
        }

        let index = rotation.current;
        rotation.counts[index] += 1;

        debug!(
            index,
            requests = rotation.counts[index],
            url = self.endpoints[index].url(),
            "RPC connection selected"
        );

        self.endpoints[index].clone()
    }

    /// Counters of the current window, in endpoint order.
    pub fn snapshot(&self) -> Vec<RpcEndpointState> {
        let rotation = self.rotation.lock();
        self.endpoints
            .iter()
            .zip(rotation.counts.iter())
            .map(|(endpoint, &requests)| RpcEndpointState {
                url: endpoint.url().to_string(),
                requests,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn max_requests_per_endpoint(&self) -> u32 {
        self.max_requests_per_endpoint
    }
}
