//! Best-effort explorer verification of deployed contracts.

use alloy_core::primitives::Address;

use crate::{
    abi::{self, ArgValue},
    address_map::DeployedContract,
    error::VerificationError,
    network::NetworkConfig,
    outcome::VerificationOutcome,
    plan::DeploymentPlan,
    traits::{VerificationReceipt, VerificationService},
};

/// Submits deployed contracts to a [`VerificationService`].
///
/// Never fails: every problem becomes a `skipped` or `failed` outcome.
#[derive(Debug)]
pub struct ContractVerifier<'a, V> {
    service: &'a V,
    network: &'a NetworkConfig,
}

impl<'a, V: VerificationService> ContractVerifier<'a, V> {
    pub fn new(service: &'a V, network: &'a NetworkConfig) -> Self {
        Self { service, network }
    }

    /// Why nothing can be submitted on this network, if anything prevents it.
    fn unavailable(&self) -> Option<VerificationError> {
        if !self.network.supports_verification() {
            Some(VerificationError::Unsupported(self.network.name.clone()))
        } else if self.network.explorer_api_key.is_none() {
            Some(VerificationError::MissingApiKey)
        } else {
            None
        }
    }

    /// Verify one contract compiled from `source`.
    pub async fn verify(
        &self,
        logical_name: &str,
        source: &str,
        address: Address,
        constructor_args: &[ArgValue],
    ) -> VerificationOutcome {
        if let Some(reason) = self.unavailable() {
            tracing::info!(contract = %logical_name, %reason, "Skipping verification");
            return VerificationOutcome::skipped(logical_name, address, reason.to_string());
        }

        tracing::info!(contract = %logical_name, %address, "Verifying contract...");
        let encoded = abi::encode_args(constructor_args);

        match self
            .service
            .submit_verification(address, source, &encoded)
            .await
        {
            Ok(VerificationReceipt::Verified) => {
                tracing::info!(contract = %logical_name, "Contract verified");
                VerificationOutcome::verified(logical_name, address)
            }
            Ok(VerificationReceipt::AlreadyVerified) => {
                tracing::info!(contract = %logical_name, "Contract already verified");
                VerificationOutcome::skipped(logical_name, address, "already verified")
            }
            Err(e) => {
                let err = VerificationError::Service(format!("{:#}", e));
                tracing::warn!(contract = %logical_name, error = %err, "Verification failed");
                VerificationOutcome::failed(logical_name, address, err.to_string())
            }
        }
    }

    /// Verify every deployed contract, sequentially, in deployment order.
    pub async fn verify_all(
        &self,
        plan: &DeploymentPlan,
        deployed: &[DeployedContract],
    ) -> Vec<VerificationOutcome> {
        let mut outcomes = Vec::with_capacity(deployed.len());
        for contract in deployed {
            let source = plan
                .contracts
                .iter()
                .find(|spec| spec.logical_name == contract.logical_name)
                .map(|spec| spec.artifact_name())
                .unwrap_or(contract.logical_name.as_str());

            outcomes.push(
                self.verify(
                    &contract.logical_name,
                    source,
                    contract.address,
                    &contract.constructor_args,
                )
                .await,
            );
        }
        outcomes
    }
}
