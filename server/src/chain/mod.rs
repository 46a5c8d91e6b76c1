//! Chain client boundary
//!
//! The relay never talks to a node directly: everything goes through the
//! [`ChainClient`] trait, which exposes the handful of raw JSON-RPC style
//! operations the oracle pool needs. Typed access to the two FlightSurety
//! contracts lives in [`contracts`].

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

pub mod bindings;
pub mod contracts;
#[cfg(feature = "test-util")]
pub mod memory;
pub mod rpc;

pub use contracts::{FlightSuretyApp, FlightSuretyData};
#[cfg(feature = "test-util")]
pub use memory::InMemoryChain;
pub use rpc::JsonRpcChain;

/// Errors surfaced by a chain client
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("abi decode error: {0}")]
    Decode(#[from] alloy_sol_types::Error),

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("no receipt for transaction {0} after waiting")]
    ReceiptTimeout(B256),
}

/// A state-mutating transaction attributed to an unlocked node account
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas: u64,
    pub gas_price: u64,
}

/// Log query, inclusive on both block bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: Option<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

/// Raw log as returned by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_hash: Option<B256>,
}

#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Accounts managed by the node, in node order.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Read-only contract call against the latest block.
    async fn call(&self, from: Option<Address>, to: Address, data: Bytes)
        -> Result<Bytes, ChainError>;

    /// Submits a transaction and resolves once it is confirmed.
    async fn send(&self, tx: TxRequest) -> Result<B256, ChainError>;

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError>;
}
