//! Migration Transport Layer
//!
//! JSON-RPC access to the source and target chains.
//!
//! This crate provides:
//! - [`client`]: the [`RpcClient`] seam and its HTTP implementation
//! - [`eth`]: typed `eth_*` helpers available on any client via [`EthApi`]
//! - [`network`]: default endpoints and their environment variables
//! - [`mock`]: a scripted in-memory client for tests
//!
//! # Example
//!
//! ```ignore
//! use migration_transport::{EthApi, HttpRpcClient};
//! use migration_verifier_types::ChainEndpoint;
//!
//! let target = HttpRpcClient::new(ChainEndpoint::target("http://127.0.0.1:8000"));
//! let tip = target.block_number().await?;
//! ```

pub mod client;
pub mod eth;
pub mod jsonrpc;
pub mod mock;
pub mod network;

pub use client::{HttpRpcClient, RpcClient};
pub use eth::EthApi;
pub use mock::MockRpcClient;

use std::sync::Arc;
use std::time::Duration;

use migration_verifier_types::ChainEndpoint;

/// Build a shareable HTTP client for `endpoint` with a per-request timeout.
pub fn connect(endpoint: ChainEndpoint, timeout: Duration) -> Arc<dyn RpcClient> {
    Arc::new(HttpRpcClient::with_timeouts(
        endpoint,
        timeout,
        HttpRpcClient::DEFAULT_CONNECT_TIMEOUT.min(timeout),
    ))
}
