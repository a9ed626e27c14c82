//! Per-step outcomes recorded by each phase.

use alloy_core::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{
    address_map::DeployedContract,
    error::{DeploymentError, GrantError},
    plan::RoleGrantSpec,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeployStatus {
    Deployed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOutcome {
    pub logical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub status: DeployStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContractOutcome {
    pub fn deployed(contract: &DeployedContract) -> Self {
        Self {
            logical_name: contract.logical_name.clone(),
            address: Some(contract.address),
            status: DeployStatus::Deployed,
            error: None,
        }
    }

    pub fn failed(logical_name: &str, error: &DeploymentError) -> Self {
        Self {
            logical_name: logical_name.to_string(),
            address: None,
            status: DeployStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GrantStatus {
    Granted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantOutcome {
    pub target: String,
    /// Accessor name of the role, e.g. `MINTER_ROLE`.
    pub role: String,
    /// Role identifier as fetched from the role source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grantee: Option<Address>,
    pub status: GrantStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrantOutcome {
    pub fn granted(spec: &RoleGrantSpec, role_id: B256, grantee: Address, tx_hash: B256) -> Self {
        Self {
            target: spec.target.clone(),
            role: spec.role.clone(),
            role_id: Some(role_id),
            grantee: Some(grantee),
            status: GrantStatus::Granted,
            tx_hash: Some(tx_hash),
            error: None,
        }
    }

    /// `role_id` and `grantee` are whatever was known when the grant failed.
    pub fn failed(
        spec: &RoleGrantSpec,
        role_id: Option<B256>,
        grantee: Option<Address>,
        error: &GrantError,
    ) -> Self {
        Self {
            target: spec.target.clone(),
            role: spec.role.clone(),
            role_id,
            grantee,
            status: GrantStatus::Failed,
            tx_hash: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationStatus {
    Verified,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub logical_name: String,
    pub address: Address,
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationOutcome {
    pub fn verified(logical_name: &str, address: Address) -> Self {
        Self {
            logical_name: logical_name.to_string(),
            address,
            status: VerificationStatus::Verified,
            reason: None,
        }
    }

    pub fn skipped(logical_name: &str, address: Address, reason: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.to_string(),
            address,
            status: VerificationStatus::Skipped,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(logical_name: &str, address: Address, reason: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.to_string(),
            address,
            status: VerificationStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}
