//! Deployment plan: the ordered contract specs and the role grants that follow them.
//!
//! Order in the plan is the deployment order. A constructor argument may only reference
//! a logical name declared strictly earlier, which keeps the dependency graph acyclic
//! by construction.

use std::{collections::HashSet, path::Path};

use alloy_core::primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    abi::ArgValue,
    address_map::AddressMap,
    error::{LookupError, PlanError},
};

pub const USER_REGISTRY: &str = "UserRegistry";
pub const SKILL_VERIFICATION: &str = "SkillVerification";
pub const SKILL_TOKEN: &str = "SkillToken";
pub const REPUTATION_TOKEN: &str = "ReputationToken";
pub const PROJECT_ESCROW: &str = "ProjectEscrow";
pub const SKILL_PLATFORM: &str = "SkillPlatform";

pub const PLATFORM_ROLE: &str = "PLATFORM_ROLE";
pub const MINTER_ROLE: &str = "MINTER_ROLE";

/// A single constructor argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorArg {
    /// Passed through unchanged.
    Literal(ArgValue),
    /// The address of an earlier contract in the plan.
    Reference(String),
}

impl ConstructorArg {
    pub fn reference(logical_name: impl Into<String>) -> Self {
        Self::Reference(logical_name.into())
    }

    /// Resolve against the addresses produced so far.
    pub fn resolve(&self, addresses: &AddressMap) -> Result<ArgValue, LookupError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Reference(name) => addresses.get(name).map(ArgValue::Address),
        }
    }
}

/// One contract to instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub logical_name: String,
    /// Compilation artifact holding the creation bytecode. Defaults to the logical name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default)]
    pub args: Vec<ConstructorArg>,
}

impl ContractSpec {
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            artifact: None,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: ConstructorArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn literal(self, value: impl Into<ArgValue>) -> Self {
        self.arg(ConstructorArg::Literal(value.into()))
    }

    pub fn reference(self, logical_name: impl Into<String>) -> Self {
        self.arg(ConstructorArg::reference(logical_name))
    }

    pub fn artifact_name(&self) -> &str {
        self.artifact.as_deref().unwrap_or(&self.logical_name)
    }

    /// Logical names this spec's constructor depends on.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            ConstructorArg::Reference(name) => Some(name.as_str()),
            ConstructorArg::Literal(_) => None,
        })
    }
}

/// The ordered sequence of contracts to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub contracts: Vec<ContractSpec>,
}

impl DeploymentPlan {
    /// Build a plan, rejecting duplicate names and references that do not point backwards.
    pub fn new(contracts: Vec<ContractSpec>) -> Result<Self, PlanError> {
        let plan = Self { contracts };
        plan.validate()?;
        Ok(plan)
    }

    /// The platform's canonical plan. Every contract is owned by `owner`.
    pub fn skill_platform(owner: Address) -> Self {
        Self {
            contracts: vec![
                ContractSpec::new(USER_REGISTRY).literal(owner),
                ContractSpec::new(SKILL_VERIFICATION).literal(owner),
                ContractSpec::new(SKILL_TOKEN).literal(owner),
                ContractSpec::new(REPUTATION_TOKEN).literal(owner),
                ContractSpec::new(PROJECT_ESCROW).literal(owner),
                ContractSpec::new(SKILL_PLATFORM)
                    .literal(owner)
                    .reference(USER_REGISTRY)
                    .reference(SKILL_VERIFICATION)
                    .reference(PROJECT_ESCROW)
                    .reference(SKILL_TOKEN)
                    .reference(REPUTATION_TOKEN),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.contracts.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut declared = HashSet::new();
        for spec in &self.contracts {
            // Checked before inserting so self-references are rejected too.
            for reference in spec.references() {
                if !declared.contains(reference) {
                    return Err(PlanError::ForwardReference {
                        contract: spec.logical_name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
            if !declared.insert(spec.logical_name.as_str()) {
                return Err(PlanError::DuplicateName(spec.logical_name.clone()));
            }
        }
        Ok(())
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.contracts
            .iter()
            .any(|spec| spec.logical_name == logical_name)
    }

    /// Check that every contract a grant names is part of this plan.
    pub fn validate_grants(&self, grants: &[RoleGrantSpec]) -> Result<(), PlanError> {
        for grant in grants {
            for name in grant.contract_names() {
                if !self.contains(name) {
                    return Err(PlanError::UnknownGrantContract {
                        role: grant.role.clone(),
                        target: grant.target.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Who receives a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grantee {
    /// A contract deployed by this run.
    Contract(String),
    /// An externally owned or pre-existing address.
    Address(Address),
}

impl Grantee {
    pub fn resolve(&self, addresses: &AddressMap) -> Result<Address, LookupError> {
        match self {
            Self::Contract(name) => addresses.get(name),
            Self::Address(address) => Ok(*address),
        }
    }
}

/// A role grant to issue once every contract exists.
///
/// The role identifier is not known statically: it is read from `role_source` by
/// calling the `role` accessor at grant time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrantSpec {
    /// Name of the read-only accessor returning the role identifier, e.g. `MINTER_ROLE`.
    pub role: String,
    /// Contract exposing the accessor. Defaults to `target`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_source: Option<String>,
    /// Contract on which `grantRole` is called.
    pub target: String,
    pub grantee: Grantee,
}

impl RoleGrantSpec {
    /// Grant `role` on `target` to the contract deployed as `grantee`.
    pub fn to_contract(
        role: impl Into<String>,
        target: impl Into<String>,
        grantee: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            role_source: None,
            target: target.into(),
            grantee: Grantee::Contract(grantee.into()),
        }
    }

    /// The platform's canonical grant list.
    pub fn skill_platform() -> Vec<Self> {
        vec![
            Self::to_contract(PLATFORM_ROLE, PROJECT_ESCROW, SKILL_PLATFORM),
            Self::to_contract(MINTER_ROLE, SKILL_TOKEN, SKILL_PLATFORM),
            Self::to_contract(MINTER_ROLE, REPUTATION_TOKEN, SKILL_PLATFORM),
        ]
    }

    pub fn role_source(&self) -> &str {
        self.role_source.as_deref().unwrap_or(&self.target)
    }

    /// Canonical signature of the role accessor.
    pub fn accessor_signature(&self) -> String {
        format!("{}()", self.role)
    }

    /// Every logical name this grant depends on.
    pub fn contract_names(&self) -> Vec<&str> {
        let mut names = vec![self.role_source(), self.target.as_str()];
        if let Grantee::Contract(name) = &self.grantee {
            names.push(name.as_str());
        }
        names
    }
}

/// A plan and grant list loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanManifest {
    pub contracts: Vec<ContractSpec>,
    #[serde(default)]
    pub grants: Vec<RoleGrantSpec>,
}

impl PlanManifest {
    /// Load and validate a manifest.
    pub fn load_from_file(path: &Path) -> anyhow::Result<(DeploymentPlan, Vec<RoleGrantSpec>)> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan manifest {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<(DeploymentPlan, Vec<RoleGrantSpec>)> {
        let manifest: Self =
            toml::from_str(content).context("Failed to parse plan manifest as TOML")?;
        let plan = DeploymentPlan::new(manifest.contracts)?;
        plan.validate_grants(&manifest.grants)?;
        Ok((plan, manifest.grants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::repeat_byte(0x0f)
    }

    #[test]
    fn test_canonical_plan_is_valid() {
        let plan = DeploymentPlan::skill_platform(owner());
        assert!(plan.validate().is_ok());
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.contracts.last().unwrap().logical_name, SKILL_PLATFORM);

        let refs: Vec<_> = plan.contracts[5].references().collect();
        assert_eq!(
            refs,
            [USER_REGISTRY, SKILL_VERIFICATION, PROJECT_ESCROW, SKILL_TOKEN, REPUTATION_TOKEN]
        );

        let grants = RoleGrantSpec::skill_platform();
        assert!(plan.validate_grants(&grants).is_ok());
    }

    #[test]
    fn test_forward_reference_rejected() {
        let result = DeploymentPlan::new(vec![
            ContractSpec::new("A").reference("B"),
            ContractSpec::new("B"),
        ]);
        assert_eq!(
            result,
            Err(PlanError::ForwardReference {
                contract: "A".to_string(),
                reference: "B".to_string(),
            })
        );
    }

    #[test]
    fn test_self_reference_rejected() {
        let result = DeploymentPlan::new(vec![ContractSpec::new("A").reference("A")]);
        assert!(matches!(result, Err(PlanError::ForwardReference { .. })));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = DeploymentPlan::new(vec![ContractSpec::new("A"), ContractSpec::new("A")]);
        assert_eq!(result, Err(PlanError::DuplicateName("A".to_string())));
        assert_eq!(DeploymentPlan::new(vec![]), Err(PlanError::Empty));
    }

    #[test]
    fn test_grant_naming_unplanned_contract_rejected() {
        let plan = DeploymentPlan::new(vec![ContractSpec::new(SKILL_TOKEN)]).unwrap();
        let grants = vec![RoleGrantSpec::to_contract(MINTER_ROLE, SKILL_TOKEN, SKILL_PLATFORM)];
        assert!(matches!(
            plan.validate_grants(&grants),
            Err(PlanError::UnknownGrantContract { name, .. }) if name == SKILL_PLATFORM
        ));
    }

    #[test]
    fn test_resolve_constructor_args() {
        let mut addresses = AddressMap::new();
        addresses.insert(USER_REGISTRY, Address::with_last_byte(1));

        let literal = ConstructorArg::Literal(ArgValue::Bool(true));
        assert_eq!(literal.resolve(&addresses), Ok(ArgValue::Bool(true)));

        let reference = ConstructorArg::reference(USER_REGISTRY);
        assert_eq!(
            reference.resolve(&addresses),
            Ok(ArgValue::Address(Address::with_last_byte(1)))
        );

        let missing = ConstructorArg::reference(SKILL_TOKEN);
        assert_eq!(
            missing.resolve(&addresses),
            Err(LookupError(SKILL_TOKEN.to_string()))
        );
    }

    #[test]
    fn test_role_source_defaults_to_target() {
        let grant = RoleGrantSpec::to_contract(MINTER_ROLE, SKILL_TOKEN, SKILL_PLATFORM);
        assert_eq!(grant.role_source(), SKILL_TOKEN);
        assert_eq!(grant.accessor_signature(), "MINTER_ROLE()");
        assert_eq!(grant.contract_names(), [SKILL_TOKEN, SKILL_TOKEN, SKILL_PLATFORM]);
    }

    #[test]
    fn test_manifest_parse() {
        let manifest = r#"
            [[contracts]]
            logical_name = "Token"
            args = [{ literal = { type = "address", value = "0x000000000000000000000000000000000000dead" } }]

            [[contracts]]
            logical_name = "Vault"
            artifact = "VaultV2"
            args = [{ reference = "Token" }]

            [[grants]]
            role = "MINTER_ROLE"
            target = "Token"
            grantee = { contract = "Vault" }
        "#;

        let (plan, grants) = PlanManifest::parse(manifest).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.contracts[1].artifact_name(), "VaultV2");
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].grantee, Grantee::Contract("Vault".to_string()));
    }

    #[test]
    fn test_manifest_with_forward_reference_fails() {
        let manifest = r#"
            [[contracts]]
            logical_name = "Vault"
            args = [{ reference = "Token" }]

            [[contracts]]
            logical_name = "Token"
        "#;
        assert!(PlanManifest::parse(manifest).is_err());
    }
}
