use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::Parser;
use skillchain_deploy::DEFAULT_ARTIFACTS_DIR;
use tracing::level_filters::LevelFilter;

/// Where deployment reports are written by default.
pub const DEFAULT_OUT_DIR: &str = "deployments";

/// How the final report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ReportFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "skillchain")]
#[command(
    author,
    version,
    about = "Deploy and provision the skill platform contracts on a target network"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SKILLCHAIN_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The name of the target network (e.g. hardhat, sepolia, amoy, polygon).
    #[arg(
        short,
        long,
        env = "SKILLCHAIN_NETWORK",
        required_unless_present = "list_networks"
    )]
    pub network: Option<String>,

    /// Verify deployed contracts on the network's block explorer.
    ///
    /// Verification is best-effort: failures are reported but never fail the run.
    #[arg(long, env = "SKILLCHAIN_VERIFY", default_value_t = false)]
    pub verify: bool,

    /// Validate the plan and the endpoint without sending any transaction.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Print the recognized networks and exit.
    #[arg(long, default_value_t = false)]
    pub list_networks: bool,

    /// Path to a TOML file extending or overriding the built-in network table.
    #[arg(long, alias = "conf", env = "SKILLCHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the Hardhat artifacts directory.
    #[arg(long, env = "SKILLCHAIN_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Path to a TOML plan manifest replacing the built-in platform plan.
    #[arg(long, env = "SKILLCHAIN_PLAN")]
    pub plan: Option<PathBuf>,

    /// Owner of the deployed contracts. Defaults to the deployer address.
    #[arg(long, env = "SKILLCHAIN_OWNER")]
    pub owner: Option<Address>,

    /// Directory where the deployment report is written as `<network>.json`.
    #[arg(long, alias = "out-dir", env = "SKILLCHAIN_OUT", default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// How to print the final report.
    #[arg(long, env = "SKILLCHAIN_FORMAT", default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["skillchain", "--network", "sepolia", "--verify"]).unwrap();
        assert_eq!(cli.network.as_deref(), Some("sepolia"));
        assert!(cli.verify);
        assert!(!cli.dry_run);
        assert_eq!(cli.format, ReportFormat::Table);
        assert_eq!(cli.out, PathBuf::from(DEFAULT_OUT_DIR));
    }

    #[test]
    fn test_list_networks_without_network() {
        let cli = Cli::try_parse_from(["skillchain", "--list-networks"]).unwrap();
        assert!(cli.list_networks);
    }

    #[test]
    fn test_owner_and_format() {
        let cli = Cli::try_parse_from([
            "skillchain",
            "-n",
            "hardhat",
            "--owner",
            "0x000000000000000000000000000000000000dead",
            "--format",
            "json",
        ])
        .unwrap();
        let owner = cli.owner.unwrap();
        assert_eq!(&owner.as_slice()[18..], &[0xde, 0xad]);
        assert_eq!(cli.format, ReportFormat::Json);
    }
}
