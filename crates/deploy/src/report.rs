//! Final run report: aggregation, readiness, rendering and persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Table;
use serde::{Deserialize, Serialize};

use crate::{
    address_map::AddressMap,
    deployer::PlanExecution,
    network::NetworkConfig,
    outcome::{
        ContractOutcome, DeployStatus, GrantOutcome, GrantStatus, VerificationOutcome,
        VerificationStatus,
    },
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OverallStatus {
    /// The deployment phase finished. Grants or verifications may still have failed.
    Completed,
    /// The deployment phase short-circuited.
    Failed,
}

/// What a caller can do with the deployed platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Readiness {
    /// Every contract deployed and every grant succeeded.
    FullyUsable,
    /// Every contract deployed, but at least one grant failed.
    MissingPermissions,
    /// Deployment failed.
    Unusable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub network: String,
    pub chain_id: u64,
    pub generated_at: DateTime<Utc>,
    pub address_map: AddressMap,
    pub deployment_outcomes: Vec<ContractOutcome>,
    pub grant_outcomes: Vec<GrantOutcome>,
    pub verification_outcomes: Vec<VerificationOutcome>,
    pub overall_status: OverallStatus,
    /// Why the deployment phase stopped, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl DeploymentReport {
    pub fn readiness(&self) -> Readiness {
        match self.overall_status {
            OverallStatus::Failed => Readiness::Unusable,
            OverallStatus::Completed
                if self
                    .grant_outcomes
                    .iter()
                    .any(|grant| grant.status == GrantStatus::Failed) =>
            {
                Readiness::MissingPermissions
            }
            OverallStatus::Completed => Readiness::FullyUsable,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.overall_status == OverallStatus::Completed
    }

    pub fn deployed_count(&self) -> usize {
        self.deployment_outcomes
            .iter()
            .filter(|outcome| outcome.status == DeployStatus::Deployed)
            .count()
    }

    /// Render the three outcome lists as human-readable tables.
    pub fn render_table(&self) -> String {
        let mut contracts = Table::new();
        contracts.set_header(vec!["Contract", "Address", "Status", "Error"]);
        for outcome in &self.deployment_outcomes {
            contracts.add_row(vec![
                outcome.logical_name.clone(),
                outcome.address.map(|a| a.to_string()).unwrap_or_default(),
                outcome.status.to_string(),
                outcome.error.clone().unwrap_or_default(),
            ]);
        }

        let mut grants = Table::new();
        grants.set_header(vec!["Target", "Role", "Grantee", "Status", "Error"]);
        for outcome in &self.grant_outcomes {
            grants.add_row(vec![
                outcome.target.clone(),
                outcome.role.clone(),
                outcome.grantee.map(|a| a.to_string()).unwrap_or_default(),
                outcome.status.to_string(),
                outcome.error.clone().unwrap_or_default(),
            ]);
        }

        let mut output = format!(
            "Network: {} (chain id {})\nStatus: {} ({})\n\n{}\n",
            self.network,
            self.chain_id,
            self.overall_status,
            self.readiness(),
            contracts
        );
        if let Some(failure) = &self.failure {
            output.push_str(&format!("Failure: {}\n", failure));
        }
        if !self.grant_outcomes.is_empty() {
            output.push_str(&format!("\n{}\n", grants));
        }
        if !self.verification_outcomes.is_empty() {
            let mut verifications = Table::new();
            verifications.set_header(vec!["Contract", "Verification", "Reason"]);
            for outcome in &self.verification_outcomes {
                verifications.add_row(vec![
                    outcome.logical_name.clone(),
                    outcome.status.to_string(),
                    outcome.reason.clone().unwrap_or_default(),
                ]);
            }
            output.push_str(&format!("\n{}\n", verifications));
        }
        output
    }

    /// Save the report as formatted JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment report")?;
        std::fs::write(path, json).context(format!(
            "Failed to write deployment report to {}",
            path.display()
        ))?;

        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment report does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment report from {}",
            path.display()
        ))?;

        serde_json::from_str(&content).context(format!(
            "Failed to parse deployment report from {}",
            path.display()
        ))
    }
}

/// Aggregates phase outcomes into a [`DeploymentReport`]. Pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentReporter;

impl DeploymentReporter {
    pub fn aggregate(
        network: &NetworkConfig,
        execution: PlanExecution,
        grant_outcomes: Vec<GrantOutcome>,
        verification_outcomes: Vec<VerificationOutcome>,
    ) -> DeploymentReport {
        let overall_status = if execution.is_complete() {
            OverallStatus::Completed
        } else {
            OverallStatus::Failed
        };

        let report = DeploymentReport {
            network: network.name.clone(),
            chain_id: network.chain_id,
            generated_at: Utc::now(),
            address_map: execution.addresses,
            deployment_outcomes: execution.outcomes,
            grant_outcomes,
            verification_outcomes,
            overall_status,
            failure: execution.failure.map(|err| err.to_string()),
        };

        tracing::info!(
            network = %report.network,
            status = %report.overall_status,
            readiness = %report.readiness(),
            deployed = report.deployed_count(),
            grants_failed = report
                .grant_outcomes
                .iter()
                .filter(|g| g.status == GrantStatus::Failed)
                .count(),
            verified = report
                .verification_outcomes
                .iter()
                .filter(|v| v.status == VerificationStatus::Verified)
                .count(),
            "Deployment report ready"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{Address, B256};
    use tempdir::TempDir;
    use url::Url;

    use super::*;
    use crate::{
        address_map::DeployedContract,
        error::{DeploymentError, GrantError},
        network::GasPricePolicy,
        plan::RoleGrantSpec,
    };

    fn network() -> NetworkConfig {
        NetworkConfig {
            name: "hardhat".to_string(),
            rpc_url: Url::parse("http://127.0.0.1:8545").unwrap(),
            chain_id: 31337,
            signer: None,
            gas_price: GasPricePolicy::Auto,
            explorer: None,
            explorer_api_key: None,
        }
    }

    fn deployed(name: &str, byte: u8) -> DeployedContract {
        DeployedContract {
            logical_name: name.to_string(),
            address: Address::with_last_byte(byte),
            tx_hash: B256::with_last_byte(byte),
            block_number: byte as u64,
            constructor_args: vec![],
        }
    }

    fn execution(failure: Option<DeploymentError>) -> PlanExecution {
        let contract = deployed("Token", 1);
        let mut addresses = AddressMap::new();
        addresses.insert("Token", contract.address);
        let mut outcomes = vec![ContractOutcome::deployed(&contract)];
        if let Some(err) = &failure {
            outcomes.push(ContractOutcome::failed(err.contract(), err));
        }
        PlanExecution {
            outcomes,
            addresses,
            deployed: vec![contract],
            failure,
        }
    }

    fn failed_grant() -> GrantOutcome {
        let spec = RoleGrantSpec::to_contract("MINTER_ROLE", "Token", "Vault");
        GrantOutcome::failed(
            &spec,
            None,
            None,
            &GrantError::Lookup(crate::error::LookupError("Vault".to_string())),
        )
    }

    #[test]
    fn test_readiness_levels() {
        let report = DeploymentReporter::aggregate(&network(), execution(None), vec![], vec![]);
        assert_eq!(report.overall_status, OverallStatus::Completed);
        assert_eq!(report.readiness(), Readiness::FullyUsable);

        let report =
            DeploymentReporter::aggregate(&network(), execution(None), vec![failed_grant()], vec![]);
        assert_eq!(report.overall_status, OverallStatus::Completed);
        assert_eq!(report.readiness(), Readiness::MissingPermissions);

        let failure = DeploymentError::Submission {
            contract: "Vault".to_string(),
            reason: "nonce too low".to_string(),
        };
        let report =
            DeploymentReporter::aggregate(&network(), execution(Some(failure)), vec![], vec![]);
        assert_eq!(report.overall_status, OverallStatus::Failed);
        assert_eq!(report.readiness(), Readiness::Unusable);
        assert!(report.failure.as_deref().unwrap().contains("nonce too low"));
    }

    #[test]
    fn test_verification_failures_keep_completed() {
        let verification = VerificationOutcome::failed("Token", Address::with_last_byte(1), "down");
        let report =
            DeploymentReporter::aggregate(&network(), execution(None), vec![], vec![verification]);
        assert!(report.is_completed());
        assert_eq!(report.deployed_count(), 1);
    }

    #[test]
    fn test_render_table() {
        let report =
            DeploymentReporter::aggregate(&network(), execution(None), vec![failed_grant()], vec![]);
        let rendered = report.render_table();
        assert!(rendered.contains("Token"));
        assert!(rendered.contains("missing-permissions"));
        assert!(rendered.contains("MINTER_ROLE"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new("skillchain-report").unwrap();
        let path = dir.path().join("deployments").join("hardhat.json");

        let report =
            DeploymentReporter::aggregate(&network(), execution(None), vec![failed_grant()], vec![]);
        report.save_to_file(&path).unwrap();

        let loaded = DeploymentReport::load_from_file(&path).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.address_map.get("Token").unwrap(), Address::with_last_byte(1));
    }

    #[test]
    fn test_load_missing_report() {
        let dir = TempDir::new("skillchain-report").unwrap();
        assert!(DeploymentReport::load_from_file(&dir.path().join("missing.json")).is_err());
    }
}
