//! Builder module for wiring a runnable [`Deployment`].
//!
//! [`DeploymentBuilder`] resolves the target network, loads the plan, and wires the
//! JSON-RPC transport and the explorer client into an [`Orchestrator`].

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;

use crate::{
    artifacts::{ArtifactStore, DEFAULT_ARTIFACTS_DIR},
    error::ConfigurationError,
    explorer::EtherscanVerifier,
    network::{NetworkConfig, NetworkConfigResolver, NetworkTable},
    orchestrator::Orchestrator,
    plan::{DeploymentPlan, PlanManifest, RoleGrantSpec},
    report::DeploymentReport,
    rpc::JsonRpcNetwork,
};

/// Builder for creating a [`Deployment`].
///
/// # Example
///
/// ```no_run
/// use skillchain_deploy::DeploymentBuilder;
///
/// # async fn example() -> anyhow::Result<()> {
/// let deployment = DeploymentBuilder::new("sepolia")
///     .verify(true)
///     .artifacts_dir("artifacts")
///     .build()?;
/// let report = deployment.run().await?;
/// println!("{}", report.render_table());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeploymentBuilder {
    /// Name of the target network.
    network: String,
    /// Optional TOML file extending the built-in network table.
    config_file: Option<PathBuf>,
    /// Hardhat artifacts directory.
    artifacts_dir: PathBuf,
    /// Whether to run explorer verification.
    verify: bool,
    /// Owner passed to the canonical plan. Defaults to the deployer address.
    owner: Option<Address>,
    /// Custom plan manifest replacing the canonical plan.
    plan_file: Option<PathBuf>,
    /// Receipt poll interval and overall timeout.
    confirmation_policy: Option<(Duration, Duration)>,
}

impl DeploymentBuilder {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            config_file: None,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            verify: false,
            owner: None,
            plan_file: None,
            confirmation_policy: None,
        }
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn artifacts_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = path.into();
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn plan_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_file = Some(path.into());
        self
    }

    pub fn confirmation_policy(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.confirmation_policy = Some((poll_interval, timeout));
        self
    }

    /// Build the [`Deployment`].
    ///
    /// No network traffic happens here. A missing credential is not an error yet: the
    /// deployment can still be inspected or dry-run.
    pub fn build(self) -> Result<Deployment, ConfigurationError> {
        let table = NetworkTable::load(self.config_file.as_deref())?;
        let config = NetworkConfigResolver::new(table).resolve(&self.network)?;
        let artifacts = ArtifactStore::new(&self.artifacts_dir);

        let mut network = JsonRpcNetwork::new(&config, artifacts.clone())
            .map_err(|e| ConfigurationError::InvalidCredential(format!("{:#}", e)))?;
        if let Some((poll_interval, timeout)) = self.confirmation_policy {
            network = network.with_confirmation_policy(poll_interval, timeout);
        }

        let (plan, grants) = match &self.plan_file {
            Some(path) => load_manifest(path)?,
            None => {
                let owner = self.owner.or(network.sender()).unwrap_or_else(|| {
                    tracing::warn!("No owner or signer configured, the plan uses the zero address");
                    Address::ZERO
                });
                (
                    DeploymentPlan::skill_platform(owner),
                    RoleGrantSpec::skill_platform(),
                )
            }
        };

        let verifier = if self.verify {
            explorer_client(&config, artifacts)?
        } else {
            None
        };

        tracing::info!(
            network = %config.name,
            chain_id = config.chain_id,
            rpc_url = %config.rpc_url,
            artifacts = %self.artifacts_dir.display(),
            contracts = plan.len(),
            verify = self.verify,
            "Deployment configured"
        );

        let orchestrator = Orchestrator::new(config, network).with_verification(verifier);
        let orchestrator = if self.verify {
            orchestrator
        } else {
            orchestrator.without_verification()
        };

        Ok(Deployment {
            orchestrator,
            plan,
            grants,
        })
    }
}

fn load_manifest(path: &Path) -> Result<(DeploymentPlan, Vec<RoleGrantSpec>), ConfigurationError> {
    PlanManifest::load_from_file(path).map_err(|e| ConfigurationError::Manifest(format!("{:#}", e)))
}

/// The explorer client, when the network has an explorer and a key is configured.
///
/// Otherwise verification still runs and records every contract as skipped.
fn explorer_client(
    config: &NetworkConfig,
    artifacts: ArtifactStore,
) -> Result<Option<EtherscanVerifier>, ConfigurationError> {
    let (Some(explorer), Some(api_key)) = (&config.explorer, &config.explorer_api_key) else {
        return Ok(None);
    };

    EtherscanVerifier::new(
        explorer.api_url.clone(),
        api_key.clone(),
        config.chain_id,
        artifacts,
    )
    .map(Some)
    .map_err(|e| ConfigurationError::InvalidNetworkTable(format!("{:#}", e)))
}

/// A fully wired deployment, ready to run.
#[derive(Debug)]
pub struct Deployment {
    orchestrator: Orchestrator<JsonRpcNetwork, Option<EtherscanVerifier>>,
    plan: DeploymentPlan,
    grants: Vec<RoleGrantSpec>,
}

impl Deployment {
    pub fn config(&self) -> &NetworkConfig {
        self.orchestrator.config()
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub fn grants(&self) -> &[RoleGrantSpec] {
        &self.grants
    }

    pub fn verification_enabled(&self) -> bool {
        self.orchestrator.verification_enabled()
    }

    /// Check that the endpoint serves the configured chain.
    pub async fn check_chain_id(&self) -> Result<(), ConfigurationError> {
        let config = self.config();
        let actual = self
            .orchestrator
            .network()
            .remote_chain_id()
            .await
            .map_err(|e| ConfigurationError::Unreachable {
                network: config.name.clone(),
                reason: format!("{:#}", e),
            })?;

        if actual != config.chain_id {
            return Err(ConfigurationError::ChainIdMismatch {
                network: config.name.clone(),
                expected: config.chain_id,
                actual,
            });
        }
        tracing::debug!(chain_id = actual, "Endpoint chain id matches");
        Ok(())
    }

    /// Validate everything a run would check, without sending any transaction.
    ///
    /// An unreachable endpoint is only a warning here.
    pub async fn dry_run(&self) -> Result<(), ConfigurationError> {
        self.plan.validate()?;
        self.plan.validate_grants(&self.grants)?;

        match self.check_chain_id().await {
            Ok(()) => {}
            Err(ConfigurationError::Unreachable { network, reason }) => {
                tracing::warn!(%network, %reason, "Endpoint unreachable, skipping chain id check");
            }
            Err(err) => return Err(err),
        }

        if !self.config().has_signer() {
            tracing::warn!("No signer credential configured, a real run would fail");
        }
        Ok(())
    }

    /// Preflight the endpoint, then run the pipeline.
    pub async fn run(&self) -> Result<DeploymentReport, ConfigurationError> {
        self.config().require_signer()?;
        self.check_chain_id().await?;
        self.orchestrator.run(&self.plan, &self.grants).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = DeploymentBuilder::new("hardhat");
        assert_eq!(builder.network, "hardhat");
        assert_eq!(builder.artifacts_dir, PathBuf::from("artifacts"));
        assert!(!builder.verify);
        assert!(builder.owner.is_none());
        assert!(builder.plan_file.is_none());
    }

    #[test]
    fn test_builder_with_options() {
        let builder = DeploymentBuilder::new("sepolia")
            .verify(true)
            .owner(Address::with_last_byte(1))
            .artifacts_dir("out/artifacts")
            .confirmation_policy(Duration::from_millis(10), Duration::from_secs(1));

        assert!(builder.verify);
        assert_eq!(builder.owner, Some(Address::with_last_byte(1)));
        assert_eq!(builder.artifacts_dir, PathBuf::from("out/artifacts"));
        assert!(builder.confirmation_policy.is_some());
    }

    #[test]
    fn test_build_canonical_plan_with_owner() {
        let owner = Address::repeat_byte(0x42);
        let deployment = DeploymentBuilder::new("hardhat").owner(owner).build().unwrap();

        assert_eq!(deployment.config().chain_id, 31337);
        assert_eq!(deployment.plan().len(), 6);
        assert_eq!(deployment.grants().len(), 3);
        assert!(!deployment.verification_enabled());
    }

    #[test]
    fn test_build_unknown_network() {
        let result = DeploymentBuilder::new("goerli").build();
        assert!(matches!(
            result,
            Err(ConfigurationError::UnknownNetwork { .. })
        ));
    }

    #[test]
    fn test_build_missing_manifest() {
        let result = DeploymentBuilder::new("hardhat")
            .plan_file("/nonexistent/plan.toml")
            .build();
        assert!(matches!(result, Err(ConfigurationError::Manifest(_))));
    }
}
