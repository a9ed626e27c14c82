//! skillchain deploys the skill platform contracts, wires their roles, and reports the result.

mod cli;

use std::{path::Path, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;

use cli::{Cli, ReportFormat};
use skillchain_deploy::{
    ConstructorArg, Deployment, DeploymentBuilder, DeploymentReport, Grantee, NetworkTable,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    if cli.list_networks {
        let table = NetworkTable::load(cli.config.as_deref())?;
        println!("{}", render_networks(&table));
        return Ok(ExitCode::SUCCESS);
    }

    let network = cli
        .network
        .clone()
        .context("A target network is required (--network)")?;

    let mut builder = DeploymentBuilder::new(&network)
        .artifacts_dir(&cli.artifacts)
        .verify(cli.verify);

    if let Some(config) = &cli.config {
        builder = builder.config_file(config);
    }

    if let Some(plan) = &cli.plan {
        builder = builder.plan_file(plan);
    }

    if let Some(owner) = cli.owner {
        builder = builder.owner(owner);
    }

    let deployment = builder.build()?;

    if cli.dry_run {
        deployment.dry_run().await?;
        println!("{}", render_plan(&deployment));
        tracing::info!(network = %deployment.config().name, "Dry run complete, nothing was sent");
        return Ok(ExitCode::SUCCESS);
    }

    let report = deployment.run().await?;

    print_report(&report, cli.format)?;
    save_report(&report, &cli.out);

    if report.is_completed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Persist the report as `<out>/<network>.json`. A write failure never changes the exit status.
fn save_report(report: &DeploymentReport, out: &Path) {
    let report_path = out.join(format!("{}.json", report.network));
    match report.save_to_file(&report_path) {
        Ok(()) => tracing::info!(path = %report_path.display(), "Deployment report saved"),
        Err(err) => tracing::warn!(
            path = %report_path.display(),
            error = format!("{:#}", err),
            "Failed to save deployment report"
        ),
    }
}

fn print_report(report: &DeploymentReport, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Table => println!("{}", report.render_table()),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        ),
    }
    Ok(())
}

fn render_networks(table: &NetworkTable) -> Table {
    let mut output = Table::new();
    output.set_header(vec!["Network", "Chain ID", "RPC URL", "Gas price", "Explorer"]);
    for (name, entry) in table.iter() {
        output.add_row(vec![
            name.clone(),
            entry.chain_id.to_string(),
            entry.rpc_url.to_string(),
            format!("{:?}", entry.gas_price),
            entry
                .explorer
                .as_ref()
                .map(|explorer| explorer.api_url.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    output
}

fn render_plan(deployment: &Deployment) -> String {
    let mut contracts = Table::new();
    contracts.set_header(vec!["#", "Contract", "Artifact", "Constructor arguments"]);
    for (index, spec) in deployment.plan().contracts.iter().enumerate() {
        let args = spec
            .args
            .iter()
            .map(|arg| match arg {
                ConstructorArg::Literal(value) => format!("{:?}", value),
                ConstructorArg::Reference(name) => format!("&{}", name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        contracts.add_row(vec![
            (index + 1).to_string(),
            spec.logical_name.clone(),
            spec.artifact_name().to_string(),
            args,
        ]);
    }

    let mut grants = Table::new();
    grants.set_header(vec!["Role", "Role source", "Target", "Grantee"]);
    for grant in deployment.grants() {
        let grantee = match &grant.grantee {
            Grantee::Contract(name) => format!("&{}", name),
            Grantee::Address(address) => address.to_string(),
        };
        grants.add_row(vec![
            grant.role.clone(),
            grant.role_source().to_string(),
            grant.target.clone(),
            grantee,
        ]);
    }

    format!(
        "Network: {} (chain id {})\nVerification: {}\n\n{}\n\n{}",
        deployment.config().name,
        deployment.config().chain_id,
        if deployment.verification_enabled() { "enabled" } else { "disabled" },
        contracts,
        grants
    )
}

#[cfg(test)]
mod tests {
    use skillchain_deploy::{
        AddressMap, DeploymentReporter, GasPricePolicy, NetworkConfig, PlanExecution,
    };
    use tempdir::TempDir;

    use super::*;

    fn completed_report() -> DeploymentReport {
        let network = NetworkConfig {
            name: "hardhat".to_string(),
            rpc_url: "http://127.0.0.1:8545".parse().unwrap(),
            chain_id: 31337,
            signer: None,
            gas_price: GasPricePolicy::Auto,
            explorer: None,
            explorer_api_key: None,
        };
        let execution = PlanExecution {
            outcomes: vec![],
            addresses: AddressMap::new(),
            deployed: vec![],
            failure: None,
        };
        DeploymentReporter::aggregate(&network, execution, vec![], vec![])
    }

    #[test]
    fn test_save_report_writes_network_file() {
        let dir = TempDir::new("skillchain-out").unwrap();
        let report = completed_report();

        save_report(&report, dir.path());

        let saved = DeploymentReport::load_from_file(&dir.path().join("hardhat.json")).unwrap();
        assert!(saved.is_completed());
    }

    #[test]
    fn test_unwritable_out_dir_keeps_completed_report() {
        let dir = TempDir::new("skillchain-out").unwrap();
        // A regular file where the output directory should be.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();
        let report = completed_report();

        save_report(&report, &blocked.join("deployments"));

        assert!(!blocked.join("deployments").join("hardhat.json").exists());
        assert!(report.is_completed());
    }
}
