//! The provisioning pipeline: deploy, grant, verify, report.

use crate::{
    deployer::ContractDeployer,
    error::ConfigurationError,
    network::NetworkConfig,
    plan::{DeploymentPlan, RoleGrantSpec},
    provisioner::RoleProvisioner,
    report::{DeploymentReport, DeploymentReporter},
    traits::{NetworkContext, NoVerification, VerificationService},
    verifier::ContractVerifier,
};

/// Runs a plan against one network.
///
/// Phases are strictly sequential. Grants only start once every contract exists, and
/// verification only runs when it was enabled with [`Orchestrator::with_verification`].
#[derive(Debug)]
pub struct Orchestrator<N, V = NoVerification> {
    config: NetworkConfig,
    network: N,
    verifier: V,
    verify: bool,
}

impl<N: NetworkContext> Orchestrator<N> {
    pub fn new(config: NetworkConfig, network: N) -> Self {
        Self {
            config,
            network,
            verifier: NoVerification,
            verify: false,
        }
    }
}

impl<N: NetworkContext, V: VerificationService> Orchestrator<N, V> {
    /// Enable verification through `verifier`.
    pub fn with_verification<W: VerificationService>(self, verifier: W) -> Orchestrator<N, W> {
        Orchestrator {
            config: self.config,
            network: self.network,
            verifier,
            verify: true,
        }
    }

    /// Skip the verification phase, keeping the configured verifier.
    pub fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn verification_enabled(&self) -> bool {
        self.verify
    }

    /// Execute the whole pipeline.
    ///
    /// Only configuration problems are returned as errors. A failed deployment phase
    /// yields a report with [`crate::OverallStatus::Failed`], and neither grants nor
    /// verification run for the contracts that did deploy.
    pub async fn run(
        &self,
        plan: &DeploymentPlan,
        grants: &[RoleGrantSpec],
    ) -> Result<DeploymentReport, ConfigurationError> {
        plan.validate()?;
        plan.validate_grants(grants)?;
        self.config.require_signer()?;

        tracing::info!(
            network = %self.config.name,
            chain_id = self.config.chain_id,
            contracts = plan.len(),
            grants = grants.len(),
            verify = self.verify,
            "Starting deployment..."
        );

        let execution = ContractDeployer::new(&self.network).execute(plan).await;
        if !execution.is_complete() {
            return Ok(DeploymentReporter::aggregate(
                &self.config,
                execution,
                Vec::new(),
                Vec::new(),
            ));
        }
        tracing::info!(deployed = execution.deployed.len(), "All contracts deployed");

        tracing::info!(grants = grants.len(), "Provisioning roles...");
        let grant_outcomes = RoleProvisioner::new(&self.network)
            .grant_all(grants, &execution.addresses)
            .await;

        let verification_outcomes = if self.verify {
            tracing::info!("Verifying contracts...");
            ContractVerifier::new(&self.verifier, &self.config)
                .verify_all(plan, &execution.deployed)
                .await
        } else {
            Vec::new()
        };

        Ok(DeploymentReporter::aggregate(
            &self.config,
            execution,
            grant_outcomes,
            verification_outcomes,
        ))
    }
}
