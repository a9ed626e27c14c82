//! Named networks and their resolution into a [`NetworkConfig`].
//!
//! The recognized-name table is layered with figment: built-in defaults, then an
//! optional TOML file, then `SKILLCHAIN_NET_<NAME>__<FIELD>` environment variables.
//! Signer credentials and explorer API keys only ever come from the environment.

use std::{collections::BTreeMap, fmt, path::Path};

use derive_more::{Deref, DerefMut};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigurationError;

/// Environment variables holding the deployer's private key, in lookup order.
pub const PRIVATE_KEY_ENV_VARS: [&str; 2] = ["SKILLCHAIN_PRIVATE_KEY", "PRIVATE_KEY"];

/// Environment variables holding the explorer API key, in lookup order.
pub const EXPLORER_API_KEY_ENV_VARS: [&str; 2] =
    ["SKILLCHAIN_EXPLORER_API_KEY", "ETHERSCAN_API_KEY"];

/// Prefix of environment variables overriding network table fields.
pub const NETWORK_ENV_PREFIX: &str = "SKILLCHAIN_NET_";

/// Etherscan's multichain API endpoint. The chain is selected with a `chainid` parameter.
pub const ETHERSCAN_V2_API_URL: &str = "https://api.etherscan.io/v2/api";

/// How transactions are priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasPricePolicy {
    /// Ask the node for its current gas price.
    #[default]
    Auto,
    /// A fixed price in wei.
    Fixed(u64),
}

/// Explorer endpoints for a network that supports source verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub api_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_url: Option<Url>,
}

/// One row of the recognized-network table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub rpc_url: Url,
    pub chain_id: u64,
    #[serde(default)]
    pub gas_price: GasPricePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer: Option<ExplorerConfig>,
}

/// Recognized network names mapped to their connection parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct NetworkTable(BTreeMap<String, NetworkEntry>);

impl NetworkTable {
    /// The networks known without any configuration file.
    pub fn builtin() -> Self {
        let etherscan = |browser: &str| {
            Some(ExplorerConfig {
                api_url: parse_static_url(ETHERSCAN_V2_API_URL),
                browser_url: Some(parse_static_url(browser)),
            })
        };

        let mut table = BTreeMap::new();
        table.insert(
            "hardhat".to_string(),
            NetworkEntry {
                rpc_url: parse_static_url("http://127.0.0.1:8545"),
                chain_id: 31337,
                gas_price: GasPricePolicy::Auto,
                explorer: None,
            },
        );
        table.insert(
            "sepolia".to_string(),
            NetworkEntry {
                rpc_url: parse_static_url("https://ethereum-sepolia-rpc.publicnode.com"),
                chain_id: 11155111,
                gas_price: GasPricePolicy::Auto,
                explorer: etherscan("https://sepolia.etherscan.io"),
            },
        );
        table.insert(
            "amoy".to_string(),
            NetworkEntry {
                rpc_url: parse_static_url("https://rpc-amoy.polygon.technology"),
                chain_id: 80002,
                gas_price: GasPricePolicy::Auto,
                explorer: etherscan("https://amoy.polygonscan.com"),
            },
        );
        table.insert(
            "polygon".to_string(),
            NetworkEntry {
                rpc_url: parse_static_url("https://polygon-rpc.com"),
                chain_id: 137,
                gas_price: GasPricePolicy::Auto,
                explorer: etherscan("https://polygonscan.com"),
            },
        );
        Self(table)
    }

    /// Load the table: built-in defaults, then `config_file`, then the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut figment = Figment::from(Serialized::defaults(Self::builtin()));
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigurationError::InvalidNetworkTable(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(NETWORK_ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigurationError> {
        let table: Self = figment
            .extract()
            .map_err(|e| ConfigurationError::InvalidNetworkTable(e.to_string()))?;
        tracing::debug!(networks = table.len(), "Network table loaded");
        Ok(table)
    }

    /// Comma-separated list of recognized names, for error messages.
    pub fn names(&self) -> String {
        self.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn parse_static_url(url: &str) -> Url {
    // Only called with the literals above.
    Url::parse(url).unwrap_or_else(|e| panic!("invalid built-in URL {}: {}", url, e))
}

/// Secret material whose value never appears in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a value, treating empty or whitespace-only strings as absent.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        (!value.is_empty()).then_some(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Fully resolved connection parameters for one run. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: Url,
    pub chain_id: u64,
    /// Absent for read-only / dry runs.
    pub signer: Option<Secret>,
    pub gas_price: GasPricePolicy,
    pub explorer: Option<ExplorerConfig>,
    pub explorer_api_key: Option<Secret>,
}

impl NetworkConfig {
    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    pub fn supports_verification(&self) -> bool {
        self.explorer.is_some()
    }

    /// The credential, or a configuration error if a state-changing step needs one.
    pub fn require_signer(&self) -> Result<&Secret, ConfigurationError> {
        self.signer
            .as_ref()
            .ok_or_else(|| ConfigurationError::MissingCredential(self.name.clone()))
    }
}

/// Resolves a network name into a [`NetworkConfig`].
#[derive(Debug, Clone)]
pub struct NetworkConfigResolver {
    table: NetworkTable,
}

impl NetworkConfigResolver {
    pub fn new(table: NetworkTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &NetworkTable {
        &self.table
    }

    /// Resolve `name`, reading credentials from the process environment.
    pub fn resolve(&self, name: &str) -> Result<NetworkConfig, ConfigurationError> {
        self.resolve_with_env(name, |key| std::env::var(key).ok())
    }

    /// Resolve `name`, reading credentials through `env`.
    pub fn resolve_with_env<F>(&self, name: &str, env: F) -> Result<NetworkConfig, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = name.trim().to_ascii_lowercase();
        let entry = self
            .table
            .get(&key)
            .ok_or_else(|| ConfigurationError::UnknownNetwork {
                name: name.to_string(),
                known: self.table.names(),
            })?;

        let first_set = |vars: &[&str]| vars.iter().find_map(|var| env(var).and_then(Secret::new));
        let signer = first_set(&PRIVATE_KEY_ENV_VARS);
        let explorer_api_key = first_set(&EXPLORER_API_KEY_ENV_VARS);

        tracing::debug!(
            network = %key,
            chain_id = entry.chain_id,
            rpc_url = %entry.rpc_url,
            has_signer = signer.is_some(),
            explorer = entry.explorer.is_some(),
            "Network resolved"
        );

        Ok(NetworkConfig {
            name: key,
            rpc_url: entry.rpc_url.clone(),
            chain_id: entry.chain_id,
            signer,
            gas_price: entry.gas_price,
            explorer: entry.explorer.clone(),
            explorer_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_builtin_network() {
        let resolver = NetworkConfigResolver::new(NetworkTable::builtin());
        let config = resolver.resolve_with_env("Sepolia", no_env).unwrap();

        assert_eq!(config.name, "sepolia");
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.gas_price, GasPricePolicy::Auto);
        assert!(config.supports_verification());
        assert!(!config.has_signer());
        assert!(matches!(
            config.require_signer(),
            Err(ConfigurationError::MissingCredential(name)) if name == "sepolia"
        ));
    }

    #[test]
    fn test_unknown_network() {
        let resolver = NetworkConfigResolver::new(NetworkTable::builtin());
        let err = resolver.resolve_with_env("goerli", no_env).unwrap_err();
        match err {
            ConfigurationError::UnknownNetwork { name, known } => {
                assert_eq!(name, "goerli");
                assert!(known.contains("sepolia"));
                assert!(known.contains("hardhat"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_credentials_from_env() {
        let resolver = NetworkConfigResolver::new(NetworkTable::builtin());
        let config = resolver
            .resolve_with_env("hardhat", |key| match key {
                "SKILLCHAIN_PRIVATE_KEY" => Some("   ".to_string()),
                "PRIVATE_KEY" => Some("0xabc".to_string()),
                "ETHERSCAN_API_KEY" => Some("key".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.signer.as_ref().map(Secret::expose), Some("0xabc"));
        assert_eq!(config.explorer_api_key.as_ref().map(Secret::expose), Some("key"));
        assert!(!config.supports_verification());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("super-secret").unwrap();
        assert!(!format!("{:?}", secret).contains("super-secret"));
        assert!(Secret::new("").is_none());
    }

    #[test]
    fn test_toml_overrides_and_additions() {
        let figment = Figment::from(Serialized::defaults(NetworkTable::builtin())).merge(
            Toml::string(
                r#"
                [hardhat]
                rpc_url = "http://10.0.0.2:8545"
                gas_price = { fixed = 1000000000 }

                [devnet]
                rpc_url = "http://devnet.local:8545"
                chain_id = 1337
                "#,
            ),
        );
        let table = NetworkTable::from_figment(figment).unwrap();

        let hardhat = &table["hardhat"];
        assert_eq!(hardhat.rpc_url.as_str(), "http://10.0.0.2:8545/");
        assert_eq!(hardhat.chain_id, 31337);
        assert_eq!(hardhat.gas_price, GasPricePolicy::Fixed(1_000_000_000));

        let devnet = &table["devnet"];
        assert_eq!(devnet.chain_id, 1337);
        assert_eq!(devnet.gas_price, GasPricePolicy::Auto);
        assert!(devnet.explorer.is_none());
    }

    #[test]
    fn test_invalid_table_is_configuration_error() {
        let figment = Figment::from(Serialized::defaults(NetworkTable::builtin()))
            .merge(Toml::string("[broken]\nchain_id = 5\n"));
        assert!(matches!(
            NetworkTable::from_figment(figment),
            Err(ConfigurationError::InvalidNetworkTable(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let result = NetworkTable::load(Some(Path::new("/nonexistent/skillchain.toml")));
        assert!(matches!(result, Err(ConfigurationError::InvalidNetworkTable(_))));
    }
}
