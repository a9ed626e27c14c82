//! Contract deployment: one spec at a time, then the whole plan in order.

use crate::{
    abi::ArgValue,
    address_map::{AddressMap, DeployedContract},
    error::DeploymentError,
    outcome::ContractOutcome,
    plan::{ContractSpec, DeploymentPlan},
    traits::NetworkContext,
};

/// Deploys single contracts through a [`NetworkContext`].
#[derive(Debug)]
pub struct ContractDeployer<'a, N> {
    network: &'a N,
}

/// Result of walking a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanExecution {
    /// One outcome per attempted spec. Specs after a failure have none.
    pub outcomes: Vec<ContractOutcome>,
    pub addresses: AddressMap,
    pub deployed: Vec<DeployedContract>,
    /// The error that stopped the walk, if any.
    pub failure: Option<DeploymentError>,
}

impl PlanExecution {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

impl<'a, N: NetworkContext> ContractDeployer<'a, N> {
    pub fn new(network: &'a N) -> Self {
        Self { network }
    }

    /// Deploy `spec`, resolving references against `addresses`.
    ///
    /// The caller records the returned contract in `addresses`.
    pub async fn deploy(
        &self,
        spec: &ContractSpec,
        addresses: &AddressMap,
    ) -> Result<DeployedContract, DeploymentError> {
        let contract = spec.logical_name.clone();
        if addresses.contains(&contract) {
            return Err(DeploymentError::AlreadyDeployed(contract));
        }

        let args = spec
            .args
            .iter()
            .map(|arg| arg.resolve(addresses))
            .collect::<Result<Vec<ArgValue>, _>>()
            .map_err(|source| DeploymentError::Unresolved {
                contract: contract.clone(),
                source,
            })?;

        tracing::info!(
            contract = %contract,
            artifact = spec.artifact_name(),
            args = args.len(),
            "Deploying contract..."
        );

        let pending = self
            .network
            .submit_deployment(spec.artifact_name(), &args)
            .await
            .map_err(|e| DeploymentError::Submission {
                contract: contract.clone(),
                reason: format!("{:#}", e),
            })?;

        tracing::debug!(contract = %contract, tx_hash = %*pending, "Deployment submitted");

        let confirmation = self
            .network
            .await_confirmation(pending)
            .await
            .map_err(|e| DeploymentError::Confirmation {
                contract: contract.clone(),
                reason: format!("{:#}", e),
            })?;

        if !confirmation.success {
            return Err(DeploymentError::Reverted {
                contract,
                tx_hash: confirmation.tx_hash,
            });
        }

        let address = confirmation
            .contract_address
            .ok_or(DeploymentError::MissingAddress {
                contract: contract.clone(),
                tx_hash: confirmation.tx_hash,
            })?;

        tracing::info!(
            contract = %contract,
            %address,
            block = confirmation.block_number,
            "Contract deployed"
        );

        Ok(DeployedContract {
            logical_name: contract,
            address,
            tx_hash: confirmation.tx_hash,
            block_number: confirmation.block_number,
            constructor_args: args,
        })
    }

    /// Walk `plan` in declared order, stopping at the first failure.
    pub async fn execute(&self, plan: &DeploymentPlan) -> PlanExecution {
        let mut execution = PlanExecution {
            outcomes: Vec::with_capacity(plan.len()),
            addresses: AddressMap::new(),
            deployed: Vec::with_capacity(plan.len()),
            failure: None,
        };

        for (index, spec) in plan.contracts.iter().enumerate() {
            match self.deploy(spec, &execution.addresses).await {
                Ok(deployed) => {
                    execution
                        .addresses
                        .insert(deployed.logical_name.clone(), deployed.address);
                    execution.outcomes.push(ContractOutcome::deployed(&deployed));
                    execution.deployed.push(deployed);
                }
                Err(err) => {
                    let skipped = plan.len() - index - 1;
                    tracing::error!(
                        contract = %spec.logical_name,
                        error = %err,
                        skipped,
                        "Deployment failed, aborting remaining deployments"
                    );
                    execution
                        .outcomes
                        .push(ContractOutcome::failed(&spec.logical_name, &err));
                    execution.failure = Some(err);
                    break;
                }
            }
        }

        execution
    }
}
