//! Capabilities the orchestrator is written against.
//!
//! The orchestrator never talks to an RPC endpoint or an explorer directly; it only
//! calls these traits. [`crate::JsonRpcNetwork`] and [`crate::EtherscanVerifier`] are
//! the production implementations.

mod network;
mod verification;

pub use network::{Confirmation, NetworkContext, PendingTx};
pub use verification::{NoVerification, VerificationReceipt, VerificationService};
