//! OCR Test Network Provisioning CLI
//!
//! Deploys and configures the contracts an off-chain reporting test network
//! needs, then prints the resulting addresses as JSON for job-spec tooling:
//!
//! - `ocr-provision deploy`          -> fee token, OCR aggregator, payees, funding
//! - `ocr-provision deploy-contract` -> one contract with default options
//! - `ocr-provision wallets`         -> configured wallet addresses and balances
//! - `ocr-provision gas-price`       -> suggested and adjusted gas price

mod commands;
mod config;
mod setup;

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use ocr_deployer::ContractKind;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use commands::{DeployOptions, OraclesFile, DEFAULT_FUND_NATIVE, DEFAULT_FUND_TOKEN};
use config::Config;
use setup::Environment;

#[derive(Parser)]
#[command(name = "ocr-provision")]
#[command(about = "Provision an OCR test network", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Network id, overriding NETWORK
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy (or reuse) the fee token, deploy the OCR aggregator, set payees
    /// and config, and fund it
    Deploy {
        /// Index of the signing wallet (default wallet if omitted)
        #[arg(short, long)]
        wallet: Option<usize>,

        /// Native value sent to the aggregator, in wei
        #[arg(long, default_value = DEFAULT_FUND_NATIVE)]
        fund_native: U256,

        /// Fee tokens sent to the aggregator, in base units
        #[arg(long, default_value = DEFAULT_FUND_TOKEN)]
        fund_token: U256,

        /// JSON file with oracle identities and the encoded off-chain config
        #[arg(long)]
        oracles: Option<PathBuf>,
    },

    /// Deploy one contract with default options
    DeployContract {
        /// token, flux, ocr, storage or vrf
        kind: ContractKind,

        /// Index of the signing wallet (default wallet if omitted)
        #[arg(short, long)]
        wallet: Option<usize>,
    },

    /// List wallet addresses and native balances
    Wallets,

    /// Show the suggested and adjusted gas price
    GasPrice,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    tokio::select! {
        result = run(cli) => result,
        _ = wait_for_shutdown_signal() => {
            error!("Interrupted; transactions already sent are not rolled back");
            std::process::exit(130);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.network.as_deref())?;
    info!(
        network = %config.network,
        retry_attempts = config.retry.attempts,
        artifacts = %config.artifacts_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Deploy {
            wallet,
            fund_native,
            fund_token,
            oracles,
        } => {
            let oracles = oracles.as_deref().map(OraclesFile::load).transpose()?;
            let env = Environment::connect(&config, true).await?;
            let options = DeployOptions {
                wallet,
                fund_native,
                fund_token,
                oracles,
            };
            print_json(commands::deploy(&env, &options)).await
        }

        Commands::DeployContract { kind, wallet } => {
            let env = Environment::connect(&config, true).await?;
            print_json(commands::deploy_contract(&env, kind, wallet)).await
        }

        Commands::Wallets => {
            let env = Environment::connect(&config, false).await?;
            print_json(commands::wallets(&env)).await
        }

        Commands::GasPrice => {
            let env = Environment::connect(&config, false).await?;
            print_json(commands::gas_price(&env)).await
        }
    }
}

async fn print_json<T, F>(command: F) -> Result<()>
where
    T: Serialize,
    F: Future<Output = Result<T>>,
{
    let summary = command.await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,ocr_deployer=debug"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, aborting");
        }
        _ = terminate => {
            info!("Received SIGTERM, aborting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy_defaults() {
        let cli = Cli::parse_from(["ocr-provision", "deploy"]);
        match cli.command {
            Commands::Deploy {
                wallet,
                fund_native,
                fund_token,
                oracles,
            } => {
                assert_eq!(wallet, None);
                assert_eq!(fund_native, U256::from(100_000_000_000_000u64));
                assert_eq!(fund_token, U256::from(2_000_000_000_000_000u64));
                assert!(oracles.is_none());
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_parse_deploy_contract_kind() {
        let cli = Cli::parse_from([
            "ocr-provision",
            "--network",
            "rsk_testnet",
            "deploy-contract",
            "storage",
            "--wallet",
            "2",
        ]);
        assert_eq!(cli.network.as_deref(), Some("rsk_testnet"));
        match cli.command {
            Commands::DeployContract { kind, wallet } => {
                assert_eq!(kind, ContractKind::Storage);
                assert_eq!(wallet, Some(2));
            }
            _ => panic!("expected deploy-contract"),
        }
    }

    #[test]
    fn test_unknown_contract_kind_rejected() {
        let result = Cli::try_parse_from(["ocr-provision", "deploy-contract", "bridge"]);
        assert!(result.is_err());
    }
}
