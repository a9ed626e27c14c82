//! Explorer verification capability.

use std::future::Future;

use alloy_core::primitives::Address;
use anyhow::Result;

/// Answer of a verification service that accepted a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationReceipt {
    Verified,
    AlreadyVerified,
}

/// Publishes contract sources to a block explorer.
pub trait VerificationService: Send + Sync {
    /// Submit `source` (an artifact name) deployed at `address` with ABI-encoded
    /// `constructor_args`.
    fn submit_verification(
        &self,
        address: Address,
        source: &str,
        constructor_args: &[u8],
    ) -> impl Future<Output = Result<VerificationReceipt>> + Send;
}

/// Stand-in used when a run has no verification service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerification;

impl VerificationService for NoVerification {
    async fn submit_verification(
        &self,
        _address: Address,
        _source: &str,
        _constructor_args: &[u8],
    ) -> Result<VerificationReceipt> {
        anyhow::bail!("Verification is not configured for this run")
    }
}

/// An absent service behaves like [`NoVerification`].
impl<V: VerificationService> VerificationService for Option<V> {
    async fn submit_verification(
        &self,
        address: Address,
        source: &str,
        constructor_args: &[u8],
    ) -> Result<VerificationReceipt> {
        match self {
            Some(service) => {
                service
                    .submit_verification(address, source, constructor_args)
                    .await
            }
            None => NoVerification.submit_verification(address, source, constructor_args).await,
        }
    }
}
