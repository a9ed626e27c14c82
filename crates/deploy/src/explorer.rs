//! Etherscan-compatible explorer client.

use std::time::Duration;

use alloy_core::primitives::Address;
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use url::Url;

use crate::{
    artifacts::ArtifactStore,
    network::Secret,
    rpc::create_client,
    traits::{VerificationReceipt, VerificationService},
};

/// Default delay between explorer requests while waiting on it.
pub const DEFAULT_EXPLORER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of retries while the explorer indexes or processes a submission.
pub const DEFAULT_EXPLORER_POLL_ATTEMPTS: usize = 12;

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

impl ExplorerResponse {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// The explorer has not caught up yet; the request is worth retrying.
#[derive(Debug, thiserror::Error)]
#[error("explorer not ready: {0}")]
struct NotReady(String);

/// Outcome of a submission request.
enum Submission {
    Queued(String),
    AlreadyVerified,
}

/// [`VerificationService`] speaking the Etherscan `contract` API module.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: Url,
    api_key: Secret,
    chain_id: u64,
    artifacts: ArtifactStore,
    poll_interval: Duration,
    poll_attempts: usize,
}

impl EtherscanVerifier {
    pub fn new(
        api_url: Url,
        api_key: Secret,
        chain_id: u64,
        artifacts: ArtifactStore,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client()?,
            api_url,
            api_key,
            chain_id,
            artifacts,
            poll_interval: DEFAULT_EXPLORER_POLL_INTERVAL,
            poll_attempts: DEFAULT_EXPLORER_POLL_ATTEMPTS,
        })
    }

    pub fn with_poll_policy(mut self, interval: Duration, attempts: usize) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.poll_interval)
            .with_max_times(self.poll_attempts)
    }

    fn common_params(&self, action: &'static str) -> Vec<(&'static str, String)> {
        vec![
            ("chainid", self.chain_id.to_string()),
            ("module", "contract".to_string()),
            ("action", action.to_string()),
            ("apikey", self.api_key.expose().to_string()),
        ]
    }

    async fn submit(
        &self,
        address: Address,
        source: &str,
        constructor_args: &[u8],
    ) -> anyhow::Result<Submission> {
        let metadata = self.artifacts.source(source)?;
        let form = [
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("sourceCode", metadata.standard_json_input),
            ("contractaddress", address.to_string()),
            ("contractname", metadata.contract_name),
            ("compilerversion", metadata.compiler_version),
            // Misspelling is part of the API.
            ("constructorArguements", hex::encode(constructor_args)),
        ];

        let response: ExplorerResponse = self
            .client
            .post(self.api_url.clone())
            .query(&self.common_params("verifysourcecode"))
            .form(&form)
            .send()
            .await
            .context("Failed to send verification request")?
            .json()
            .await
            .context("Failed to parse verification response")?;

        if response.is_ok() {
            return Ok(Submission::Queued(response.result));
        }

        let result = response.result.to_lowercase();
        if result.contains("already verified") {
            Ok(Submission::AlreadyVerified)
        } else if result.contains("unable to locate contractcode") {
            Err(NotReady(response.result).into())
        } else {
            anyhow::bail!("{}: {}", response.message, response.result)
        }
    }

    async fn check_status(&self, guid: &str) -> anyhow::Result<VerificationReceipt> {
        let mut params = self.common_params("checkverifystatus");
        params.push(("guid", guid.to_string()));

        let response: ExplorerResponse = self
            .client
            .get(self.api_url.clone())
            .query(&params)
            .send()
            .await
            .context("Failed to query verification status")?
            .json()
            .await
            .context("Failed to parse verification status")?;

        let result = response.result.to_lowercase();
        if result.contains("pending") {
            Err(NotReady(response.result).into())
        } else if result.contains("already verified") {
            Ok(VerificationReceipt::AlreadyVerified)
        } else if response.is_ok() || result.contains("pass - verified") {
            Ok(VerificationReceipt::Verified)
        } else {
            anyhow::bail!("Verification rejected: {}", response.result)
        }
    }
}

fn is_not_ready(err: &anyhow::Error) -> bool {
    err.is::<NotReady>()
}

impl VerificationService for EtherscanVerifier {
    async fn submit_verification(
        &self,
        address: Address,
        source: &str,
        constructor_args: &[u8],
    ) -> anyhow::Result<VerificationReceipt> {
        let submission = (|| self.submit(address, source, constructor_args))
            .retry(self.backoff())
            .when(is_not_ready)
            .notify(|err, delay| {
                tracing::debug!(%address, error = %err, ?delay, "Explorer has not indexed the contract yet, retrying...")
            })
            .await?;

        let guid = match submission {
            Submission::AlreadyVerified => return Ok(VerificationReceipt::AlreadyVerified),
            Submission::Queued(guid) => guid,
        };
        tracing::debug!(%address, %guid, "Verification submitted");

        (|| self.check_status(&guid))
            .retry(self.backoff())
            .when(is_not_ready)
            .notify(|_, delay| {
                tracing::debug!(%address, ?delay, "Verification pending, polling...")
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let response: ExplorerResponse = serde_json::from_str(
            r#"{"status":"0","message":"NOTOK","result":"Contract source code already verified"}"#,
        )
        .unwrap();
        assert!(!response.is_ok());
        assert!(response.result.to_lowercase().contains("already verified"));

        let response: ExplorerResponse =
            serde_json::from_str(r#"{"status":"1","message":"OK","result":"abc123"}"#).unwrap();
        assert!(response.is_ok());
    }

    #[test]
    fn test_not_ready_is_retryable() {
        let err: anyhow::Error = NotReady("Pending in queue".to_string()).into();
        assert!(is_not_ready(&err));
        assert!(!is_not_ready(&anyhow::anyhow!("Fail - Unable to verify")));
    }

    #[test]
    fn test_params_carry_chain_and_key() {
        let verifier = EtherscanVerifier::new(
            Url::parse("https://api.etherscan.io/v2/api").unwrap(),
            Secret::new("secret-key").unwrap(),
            11155111,
            ArtifactStore::new("artifacts"),
        )
        .unwrap();

        let params = verifier.common_params("checkverifystatus");
        assert!(params.contains(&("chainid", "11155111".to_string())));
        assert!(params.contains(&("action", "checkverifystatus".to_string())));
        assert!(params.contains(&("apikey", "secret-key".to_string())));
    }
}
