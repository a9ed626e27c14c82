//! skillchain-deploy - Deployment and provisioning library for the skill platform contracts.
//!
//! This crate deploys the platform's contracts in dependency order, wires the
//! cross-contract roles they need, optionally verifies their sources on a block
//! explorer, and reports the outcome of every step.

mod abi;
pub use abi::{ArgValue, encode_args, encode_call, selector};

mod address_map;
pub use address_map::{AddressMap, DeployedContract};

mod artifacts;
pub use artifacts::{ArtifactStore, DEFAULT_ARTIFACTS_DIR, SourceMetadata};

mod builder;
pub use builder::{Deployment, DeploymentBuilder};

mod deployer;
pub use deployer::{ContractDeployer, PlanExecution};

mod error;
pub use error::{
    ConfigurationError, DeploymentError, GrantError, LookupError, PlanError, VerificationError,
};

mod explorer;
pub use explorer::EtherscanVerifier;

mod network;
pub use network::{
    EXPLORER_API_KEY_ENV_VARS, ExplorerConfig, GasPricePolicy, NETWORK_ENV_PREFIX, NetworkConfig,
    NetworkConfigResolver, NetworkEntry, NetworkTable, PRIVATE_KEY_ENV_VARS, Secret,
};

mod orchestrator;
pub use orchestrator::Orchestrator;

mod outcome;
pub use outcome::{
    ContractOutcome, DeployStatus, GrantOutcome, GrantStatus, VerificationOutcome,
    VerificationStatus,
};

pub mod plan;
pub use plan::{ConstructorArg, ContractSpec, DeploymentPlan, Grantee, PlanManifest, RoleGrantSpec};

mod provisioner;
pub use provisioner::{GRANT_ROLE_SIGNATURE, RoleProvisioner};

mod report;
pub use report::{DeploymentReport, DeploymentReporter, OverallStatus, Readiness};

pub mod rpc;
pub use rpc::JsonRpcNetwork;

mod signer;
pub use signer::{LegacyTransaction, LocalSigner};

pub mod traits;
pub use traits::{
    Confirmation, NetworkContext, NoVerification, PendingTx, VerificationReceipt,
    VerificationService,
};

mod verifier;
pub use verifier::ContractVerifier;
