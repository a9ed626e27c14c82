//! JSON-RPC transport: the production [`NetworkContext`].

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use url::Url;

use crate::{
    abi::{self, ArgValue},
    artifacts::ArtifactStore,
    network::{GasPricePolicy, NetworkConfig},
    signer::{LegacyTransaction, LocalSigner},
    traits::{Confirmation, NetworkContext, PendingTx},
};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default time to wait for a transaction to be included.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Extra gas on top of the node's estimate, in percent.
const GAS_LIMIT_HEADROOM_PERCENT: u64 = 20;

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_hex_u64(&s).map_err(serde::de::Error::custom)
}

fn parse_hex_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// The subset of a transaction receipt the orchestrator needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    /// `0x1` on success. Absent on pre-Byzantium chains.
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
}

impl From<TransactionReceipt> for Confirmation {
    fn from(receipt: TransactionReceipt) -> Self {
        let success = receipt
            .status
            .as_deref()
            .map(|status| parse_hex_u64(status).is_ok_and(|status| status == 1))
            .unwrap_or(true);
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success,
            contract_address: receipt.contract_address,
        }
    }
}

/// Raised while a receipt is not available yet.
#[derive(Debug, thiserror::Error)]
#[error("transaction {0} is not confirmed yet")]
struct NotYetConfirmed(B256);

fn is_not_yet_confirmed(err: &anyhow::Error) -> bool {
    err.is::<NotYetConfirmed>()
}

/// [`NetworkContext`] over HTTP JSON-RPC, signing locally with the deployer key.
#[derive(Debug, Clone)]
pub struct JsonRpcNetwork {
    client: reqwest::Client,
    rpc_url: Url,
    chain_id: u64,
    gas_price: GasPricePolicy,
    signer: Option<LocalSigner>,
    artifacts: ArtifactStore,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl JsonRpcNetwork {
    /// Build the transport for `config`. Without a credential the transport is read-only.
    pub fn new(config: &NetworkConfig, artifacts: ArtifactStore) -> anyhow::Result<Self> {
        let signer = config
            .signer
            .as_ref()
            .map(|secret| LocalSigner::from_hex(secret.expose()))
            .transpose()?;

        Ok(Self {
            client: create_client()?,
            rpc_url: config.rpc_url.clone(),
            chain_id: config.chain_id,
            gas_price: config.gas_price,
            signer,
            artifacts,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        })
    }

    /// Set how often and how long to poll for receipts.
    pub fn with_confirmation_policy(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirmation_timeout = timeout;
        self
    }

    /// Address transactions are sent from, if a signer is configured.
    pub fn sender(&self) -> Option<Address> {
        self.signer.as_ref().map(LocalSigner::address)
    }

    /// The chain id reported by the endpoint.
    pub async fn remote_chain_id(&self) -> anyhow::Result<u64> {
        let chain_id: String = self.call("eth_chainId", vec![]).await?;
        parse_hex_u64(&chain_id).context("Invalid eth_chainId response")
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> anyhow::Result<T> {
        json_rpc_call(&self.client, self.rpc_url.as_str(), method, params).await
    }

    fn signer(&self) -> anyhow::Result<&LocalSigner> {
        self.signer
            .as_ref()
            .context("No signer credential configured; refusing to send a transaction")
    }

    async fn gas_price(&self) -> anyhow::Result<U256> {
        match self.gas_price {
            GasPricePolicy::Fixed(wei) => Ok(U256::from(wei)),
            GasPricePolicy::Auto => self
                .call("eth_gasPrice", vec![])
                .await
                .context("Failed to fetch gas price"),
        }
    }

    /// Sign and broadcast a transaction from the deployer account.
    async fn send(&self, to: Option<Address>, input: Vec<u8>) -> anyhow::Result<PendingTx> {
        let signer = self.signer()?;
        let from = signer.address();
        let input = Bytes::from(input);

        // The pending nonce keeps consecutive submissions from one account in sequence.
        let nonce: U256 = self
            .call("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await
            .context("Failed to fetch account nonce")?;
        let gas_price = self.gas_price().await?;

        let mut request = json!({ "from": from, "data": input });
        if let Some(to) = to {
            request["to"] = json!(to);
        }
        let estimate: U256 = self
            .call("eth_estimateGas", vec![request])
            .await
            .context("Failed to estimate gas")?;
        let gas_limit = estimate + estimate * U256::from(GAS_LIMIT_HEADROOM_PERCENT) / U256::from(100);

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to,
            value: U256::ZERO,
            input,
        };
        let raw = signer.sign_legacy(&tx, self.chain_id)?;

        let tx_hash: B256 = self
            .call("eth_sendRawTransaction", vec![json!(raw)])
            .await
            .context("Failed to broadcast transaction")?;

        tracing::debug!(%tx_hash, %nonce, %gas_limit, "Transaction broadcast");
        Ok(PendingTx(tx_hash))
    }

    async fn fetch_receipt(&self, tx_hash: B256) -> anyhow::Result<Confirmation> {
        let receipt: Option<TransactionReceipt> = self
            .call("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await?;
        receipt
            .map(Confirmation::from)
            .ok_or_else(|| NotYetConfirmed(tx_hash).into())
    }
}

impl NetworkContext for JsonRpcNetwork {
    async fn submit_deployment(
        &self,
        artifact: &str,
        args: &[ArgValue],
    ) -> anyhow::Result<PendingTx> {
        let mut input = self.artifacts.bytecode(artifact)?.to_vec();
        input.extend(abi::encode_args(args));
        self.send(None, input).await
    }

    async fn await_confirmation(&self, pending: PendingTx) -> anyhow::Result<Confirmation> {
        let attempts = (self.confirmation_timeout.as_millis()
            / self.poll_interval.as_millis().max(1))
        .max(1) as usize;

        (|| self.fetch_receipt(*pending))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(attempts),
            )
            .when(is_not_yet_confirmed)
            .notify(|err, _| tracing::trace!(error = %err, "Receipt not available, retrying..."))
            .await
            .map_err(|err| {
                if is_not_yet_confirmed(&err) {
                    err.context(format!(
                        "Gave up waiting for {} after {}s",
                        *pending,
                        self.confirmation_timeout.as_secs()
                    ))
                } else {
                    err.context(format!("Failed to fetch receipt for {}", *pending))
                }
            })
    }

    async fn submit_transaction(
        &self,
        contract: Address,
        method: &str,
        args: &[ArgValue],
    ) -> anyhow::Result<PendingTx> {
        self.send(Some(contract), abi::encode_call(method, args))
            .await
    }

    async fn call_read_only(
        &self,
        contract: Address,
        method: &str,
        args: &[ArgValue],
    ) -> anyhow::Result<Bytes> {
        let data = Bytes::from(abi::encode_call(method, args));
        self.call(
            "eth_call",
            vec![json!({ "to": contract, "data": data }), json!("latest")],
        )
        .await
        .with_context(|| format!("eth_call {} on {} failed", method, contract))
    }
}
