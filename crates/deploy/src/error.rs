//! Error taxonomy for a provisioning run.
//!
//! Only [`ConfigurationError`] and [`DeploymentError`] decide whether a run fails.
//! [`GrantError`] and [`VerificationError`] are recorded in their outcome lists and
//! never escape their own phase.

use alloy_core::primitives::B256;
use thiserror::Error;

/// A logical name that has no deployed address in the run's address map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no deployed address recorded for `{0}`")]
pub struct LookupError(pub String);

/// Structural problems with a deployment plan or grant list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("deployment plan is empty")]
    Empty,
    #[error("logical name `{0}` is declared more than once")]
    DuplicateName(String),
    #[error("`{contract}` references `{reference}`, which is not declared earlier in the plan")]
    ForwardReference { contract: String, reference: String },
    #[error("grant of `{role}` on `{target}` names `{name}`, which is not part of the plan")]
    UnknownGrantContract {
        role: String,
        target: String,
        name: String,
    },
}

/// Errors raised while resolving the run's configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unrecognized network `{name}` (known networks: {known})")]
    UnknownNetwork { name: String, known: String },
    #[error("network `{0}` has no signer credential; set SKILLCHAIN_PRIVATE_KEY to deploy")]
    MissingCredential(String),
    #[error("invalid signer credential: {0}")]
    InvalidCredential(String),
    #[error("invalid network table: {0}")]
    InvalidNetworkTable(String),
    #[error("endpoint for `{network}` reports chain id {actual}, expected {expected}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },
    #[error("failed to reach the endpoint for `{network}`: {reason}")]
    Unreachable { network: String, reason: String },
    #[error("invalid deployment plan: {0}")]
    Plan(#[from] PlanError),
    #[error("failed to load plan manifest: {0}")]
    Manifest(String),
}

/// Fatal failure while instantiating a contract. Aborts every later deployment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeploymentError {
    #[error("cannot resolve constructor arguments of `{contract}`: {source}")]
    Unresolved {
        contract: String,
        #[source]
        source: LookupError,
    },
    #[error("`{0}` has already been deployed in this run")]
    AlreadyDeployed(String),
    #[error("failed to submit deployment of `{contract}`: {reason}")]
    Submission { contract: String, reason: String },
    #[error("deployment of `{contract}` was not confirmed: {reason}")]
    Confirmation { contract: String, reason: String },
    #[error("deployment of `{contract}` reverted in transaction {tx_hash}")]
    Reverted { contract: String, tx_hash: B256 },
    #[error("receipt of `{contract}` deployment ({tx_hash}) carries no contract address")]
    MissingAddress { contract: String, tx_hash: B256 },
}

impl DeploymentError {
    /// The logical name of the contract whose deployment failed.
    pub fn contract(&self) -> &str {
        match self {
            Self::Unresolved { contract, .. }
            | Self::Submission { contract, .. }
            | Self::Confirmation { contract, .. }
            | Self::Reverted { contract, .. }
            | Self::MissingAddress { contract, .. } => contract,
            Self::AlreadyDeployed(contract) => contract,
        }
    }
}

/// Failure of a single role grant. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("failed to fetch `{role}` from `{source_contract}`: {reason}")]
    RoleFetch {
        role: String,
        source_contract: String,
        reason: String,
    },
    #[error("`{role}` returned by `{source_contract}` is not a 32-byte identifier")]
    MalformedRole {
        role: String,
        source_contract: String,
    },
    #[error("failed to grant `{role}` on `{target}`: {reason}")]
    Transaction {
        role: String,
        target: String,
        reason: String,
    },
    #[error("grant of `{role}` on `{target}` reverted in transaction {tx_hash}")]
    Reverted {
        role: String,
        target: String,
        tx_hash: B256,
    },
}

/// Failure of explorer verification. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("network `{0}` does not advertise explorer support")]
    Unsupported(String),
    #[error("no explorer API key configured")]
    MissingApiKey,
    #[error("verification service error: {0}")]
    Service(String),
}
