//! Role provisioning: `grantRole` calls issued once every contract exists.

use alloy_core::primitives::{Address, B256};

use crate::{
    abi::ArgValue,
    address_map::AddressMap,
    error::GrantError,
    outcome::GrantOutcome,
    plan::RoleGrantSpec,
    traits::NetworkContext,
};

/// Canonical signature of the access-control grant method.
pub const GRANT_ROLE_SIGNATURE: &str = "grantRole(bytes32,address)";

/// Issues role grants through a [`NetworkContext`].
#[derive(Debug)]
pub struct RoleProvisioner<'a, N> {
    network: &'a N,
}

/// Addresses a grant needs, resolved before any network call.
struct ResolvedGrant {
    target: Address,
    role_source: Address,
    grantee: Address,
}

impl<'a, N: NetworkContext> RoleProvisioner<'a, N> {
    pub fn new(network: &'a N) -> Self {
        Self { network }
    }

    /// Issue every grant in order. A failed grant is recorded and does not stop the rest.
    pub async fn grant_all(
        &self,
        grants: &[RoleGrantSpec],
        addresses: &AddressMap,
    ) -> Vec<GrantOutcome> {
        let mut outcomes = Vec::with_capacity(grants.len());
        for spec in grants {
            outcomes.push(self.grant(spec, addresses).await);
        }
        outcomes
    }

    /// Issue a single grant.
    pub async fn grant(&self, spec: &RoleGrantSpec, addresses: &AddressMap) -> GrantOutcome {
        let resolved = match resolve(spec, addresses) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    role = %spec.role,
                    target = %spec.target,
                    error = %err,
                    "Skipping role grant, contract address unknown"
                );
                return GrantOutcome::failed(spec, None, None, &err);
            }
        };

        let role_id = match self.fetch_role(spec, resolved.role_source).await {
            Ok(role_id) => role_id,
            Err(err) => {
                tracing::warn!(role = %spec.role, target = %spec.target, error = %err, "Role grant failed");
                return GrantOutcome::failed(spec, None, Some(resolved.grantee), &err);
            }
        };

        tracing::info!(
            role = %spec.role,
            %role_id,
            target = %spec.target,
            grantee = %resolved.grantee,
            "Granting role..."
        );

        match self.submit_grant(spec, &resolved, role_id).await {
            Ok(tx_hash) => {
                tracing::info!(role = %spec.role, target = %spec.target, %tx_hash, "Role granted");
                GrantOutcome::granted(spec, role_id, resolved.grantee, tx_hash)
            }
            Err(err) => {
                tracing::warn!(role = %spec.role, target = %spec.target, error = %err, "Role grant failed");
                GrantOutcome::failed(spec, Some(role_id), Some(resolved.grantee), &err)
            }
        }
    }

    /// Read the role identifier from its accessor.
    async fn fetch_role(&self, spec: &RoleGrantSpec, source: Address) -> Result<B256, GrantError> {
        let data = self
            .network
            .call_read_only(source, &spec.accessor_signature(), &[])
            .await
            .map_err(|e| GrantError::RoleFetch {
                role: spec.role.clone(),
                source_contract: spec.role_source().to_string(),
                reason: format!("{:#}", e),
            })?;

        // A bytes32 return value occupies exactly the first word.
        if data.len() < 32 {
            return Err(GrantError::MalformedRole {
                role: spec.role.clone(),
                source_contract: spec.role_source().to_string(),
            });
        }
        Ok(B256::from_slice(&data[..32]))
    }

    async fn submit_grant(
        &self,
        spec: &RoleGrantSpec,
        resolved: &ResolvedGrant,
        role_id: B256,
    ) -> Result<B256, GrantError> {
        let transaction_error = |e: anyhow::Error| GrantError::Transaction {
            role: spec.role.clone(),
            target: spec.target.clone(),
            reason: format!("{:#}", e),
        };

        let pending = self
            .network
            .submit_transaction(
                resolved.target,
                GRANT_ROLE_SIGNATURE,
                &[ArgValue::Bytes32(role_id), ArgValue::Address(resolved.grantee)],
            )
            .await
            .map_err(transaction_error)?;

        let confirmation = self
            .network
            .await_confirmation(pending)
            .await
            .map_err(transaction_error)?;

        if !confirmation.success {
            return Err(GrantError::Reverted {
                role: spec.role.clone(),
                target: spec.target.clone(),
                tx_hash: confirmation.tx_hash,
            });
        }
        Ok(confirmation.tx_hash)
    }
}

fn resolve(spec: &RoleGrantSpec, addresses: &AddressMap) -> Result<ResolvedGrant, GrantError> {
    Ok(ResolvedGrant {
        target: addresses.get(&spec.target)?,
        role_source: addresses.get(spec.role_source())?,
        grantee: spec.grantee.resolve(addresses)?,
    })
}
