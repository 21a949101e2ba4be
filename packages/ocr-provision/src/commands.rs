//! Subcommand implementations
//!
//! Each command returns a serializable summary; `main` prints it as JSON so
//! addresses can be fed into job specs by external tooling.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use eyre::{eyre, Result, WrapErr};
use ocr_deployer::{
    ContractKind, FluxAggregatorOptions, OffchainAggregatorConfig, OffchainAggregatorOptions,
    OracleIdentity, Wallet, WalletSet,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::setup::Environment;

/// Native value sent to the OCR aggregator by `deploy`, in wei
pub const DEFAULT_FUND_NATIVE: &str = "100000000000000";
/// Fee tokens sent to the OCR aggregator by `deploy`, in base units
pub const DEFAULT_FUND_TOKEN: &str = "2000000000000000";

// ============================================================================
// Inputs
// ============================================================================

/// Oracle set read from `--oracles`
#[derive(Debug, Clone, Deserialize)]
pub struct OraclesFile {
    pub oracles: Vec<OracleIdentity>,
    /// Off-chain config blob produced by the oracle nodes' tooling
    #[serde(default)]
    pub encoded_config: Option<Bytes>,
}

impl OraclesFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let file: OraclesFile = serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))?;
        if file.oracles.is_empty() {
            return Err(eyre!("{} lists no oracles", path.display()));
        }
        Ok(file)
    }

    /// Default protocol parameters sized to this oracle set
    pub fn aggregator_config(&self) -> OffchainAggregatorConfig {
        OffchainAggregatorConfig {
            n: self.oracles.len(),
            s: vec![1; self.oracles.len()],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub wallet: Option<usize>,
    pub fund_native: U256,
    pub fund_token: U256,
    pub oracles: Option<OraclesFile>,
}

/// Wallet at `index`, or the set's default
pub fn caller(wallets: &WalletSet, index: Option<usize>) -> Result<&Wallet> {
    let wallet = match index {
        Some(i) => wallets.wallet(i)?,
        None => wallets.default_wallet()?,
    };
    Ok(wallet)
}

// ============================================================================
// Summaries
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FundingSummary {
    pub native_amount: String,
    pub token_amount: String,
    pub native_tx: Option<TxHash>,
    pub token_tx: Option<TxHash>,
}

#[derive(Debug, Serialize)]
pub struct DeploySummary {
    pub network: String,
    pub chain_id: String,
    pub deployer: Address,
    pub fee_token: Address,
    pub fee_token_deployed: bool,
    pub ocr_aggregator: Address,
    pub ocr_deploy_tx: Option<TxHash>,
    pub payees_tx: Option<TxHash>,
    pub config_tx: Option<TxHash>,
    pub funding: FundingSummary,
    pub aggregator_token_balance: String,
}

#[derive(Debug, Serialize)]
pub struct ContractSummary {
    pub network: String,
    pub contract: String,
    pub address: Address,
    pub deploy_tx: Option<TxHash>,
}

#[derive(Debug, Serialize)]
pub struct WalletEntry {
    pub index: usize,
    pub address: Address,
    pub balance: String,
    pub default: bool,
}

#[derive(Debug, Serialize)]
pub struct WalletsSummary {
    pub network: String,
    pub wallets: Vec<WalletEntry>,
}

#[derive(Debug, Serialize)]
pub struct GasPriceSummary {
    pub network: String,
    pub chain_id: String,
    pub suggested: String,
    pub adjusted: String,
    pub slow_finality: bool,
}

// ============================================================================
// Commands
// ============================================================================

/// Fee token (reused or deployed) -> OCR aggregator -> payees and config ->
/// funding
pub async fn deploy(env: &Environment, options: &DeployOptions) -> Result<DeploySummary> {
    let deployer = env.deployer()?;
    let from = caller(&env.wallets, options.wallet)?;
    let network = env.client.network();

    let (token, fee_token_deployed) = match network.fee_token_address() {
        Some(address) => {
            info!(token = %address, "Using configured fee token");
            (deployer.instance_token(address, from), false)
        }
        None => {
            info!("No fee token configured, deploying one");
            (deployer.deploy_token(from).await?, true)
        }
    };

    let ocr = deployer
        .deploy_offchain_aggregator(from, &OffchainAggregatorOptions::default())
        .await?;

    let mut payees_tx = None;
    let mut config_tx = None;
    if let Some(file) = &options.oracles {
        payees_tx = Some(ocr.set_payees_for(&file.oracles).await?);
        match &file.encoded_config {
            Some(encoded) => {
                let input = file
                    .aggregator_config()
                    .config_input(&file.oracles, encoded.clone())?;
                config_tx = Some(ocr.set_config(&input).await?);
            }
            None => warn!("No encoded_config in oracles file, skipping setConfig"),
        }
    }

    let link = ocr.link_token().await?;
    if link != token.address() {
        warn!(
            aggregator_token = %link,
            fee_token = %token.address(),
            "Aggregator reports a different fee token"
        );
    }

    let funding = ocr.fund(options.fund_native, options.fund_token).await?;
    let balance = token.balance_of(ocr.address()).await?;

    info!(
        aggregator = %ocr.address(),
        token_balance = %balance,
        "OCR aggregator provisioned"
    );

    Ok(DeploySummary {
        network: network.id().to_string(),
        chain_id: env.client.chain_id().to_string(),
        deployer: from.address(),
        fee_token: token.address(),
        fee_token_deployed,
        ocr_aggregator: ocr.address(),
        ocr_deploy_tx: ocr.deploy_tx(),
        payees_tx,
        config_tx,
        funding: FundingSummary {
            native_amount: options.fund_native.to_string(),
            token_amount: options.fund_token.to_string(),
            native_tx: funding.native_tx,
            token_tx: funding.token_tx,
        },
        aggregator_token_balance: balance.to_string(),
    })
}

/// Deploy a single contract with default options
pub async fn deploy_contract(
    env: &Environment,
    kind: ContractKind,
    wallet: Option<usize>,
) -> Result<ContractSummary> {
    let deployer = env.deployer()?;
    let from = caller(&env.wallets, wallet)?;

    let (address, deploy_tx) = match kind {
        ContractKind::Token => {
            let handle = deployer.deploy_token(from).await?;
            (handle.address(), handle.deploy_tx())
        }
        ContractKind::FluxAggregator => {
            let handle = deployer
                .deploy_flux_aggregator(from, &FluxAggregatorOptions::default())
                .await?;
            (handle.address(), handle.deploy_tx())
        }
        ContractKind::OffchainAggregator => {
            let handle = deployer
                .deploy_offchain_aggregator(from, &OffchainAggregatorOptions::default())
                .await?;
            (handle.address(), handle.deploy_tx())
        }
        ContractKind::Storage => {
            let handle = deployer.deploy_storage(from).await?;
            (handle.address(), handle.deploy_tx())
        }
        ContractKind::Vrf => {
            let handle = deployer.deploy_vrf(from).await?;
            (handle.address(), handle.deploy_tx())
        }
    };

    Ok(ContractSummary {
        network: env.client.network().id().to_string(),
        contract: kind.label().to_string(),
        address,
        deploy_tx,
    })
}

/// Addresses and native balances of every configured wallet
pub async fn wallets(env: &Environment) -> Result<WalletsSummary> {
    let mut entries = Vec::with_capacity(env.wallets.len());
    for (index, wallet) in env.wallets.all().iter().enumerate() {
        let balance = env.client.balance(wallet.address()).await?;
        entries.push(WalletEntry {
            index,
            address: wallet.address(),
            balance: balance.to_string(),
            default: index == env.wallets.default_index(),
        });
    }

    Ok(WalletsSummary {
        network: env.client.network().id().to_string(),
        wallets: entries,
    })
}

/// Suggested gas price and the price deployments would use
pub async fn gas_price(env: &Environment) -> Result<GasPriceSummary> {
    let chain_id = env.client.chain_id();
    let suggested = env.client.suggest_gas_price().await?;
    let policy = env.client.gas_policy();
    let adjusted = policy.adjust(chain_id, U256::from(suggested));

    Ok(GasPriceSummary {
        network: env.client.network().id().to_string(),
        chain_id: chain_id.to_string(),
        suggested: suggested.to_string(),
        adjusted: adjusted.to_string(),
        slow_finality: policy.is_slow_finality(chain_id),
    })
}
