//! Network capability consumed by the orchestrator.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Result;
use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};

use crate::abi::ArgValue;

/// A submitted transaction that has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Deref, From)]
pub struct PendingTx(pub B256);

/// What the network reports once a transaction is included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub block_number: u64,
    /// Whether execution succeeded. `false` means the transaction reverted.
    pub success: bool,
    /// Address of the created contract, for deployments.
    pub contract_address: Option<Address>,
}

/// Transaction submission and read access to the target network.
///
/// Methods are named by canonical Solidity signature, e.g. `grantRole(bytes32,address)`.
/// Implementations own signing and sequencing of the single deployer account.
pub trait NetworkContext: Send + Sync {
    /// Submit a contract creation using the bytecode of `artifact`.
    fn submit_deployment(
        &self,
        artifact: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<PendingTx>> + Send;

    /// Wait until `pending` is included. One confirmation is enough.
    fn await_confirmation(
        &self,
        pending: PendingTx,
    ) -> impl Future<Output = Result<Confirmation>> + Send;

    /// Submit a state-changing call on `contract`.
    fn submit_transaction(
        &self,
        contract: Address,
        method: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<PendingTx>> + Send;

    /// Execute a read-only call and return the raw return data.
    fn call_read_only(
        &self,
        contract: Address,
        method: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<Bytes>> + Send;
}
