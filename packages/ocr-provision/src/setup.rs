//! Environment setup shared by every subcommand

use eyre::{Result, WrapErr};
use ocr_deployer::{ChainClient, ContractArtifacts, ContractDeployer, WalletSet};
use tracing::info;

use crate::config::Config;

/// Connected client, decoded wallets and loaded artifacts for one network
pub struct Environment {
    pub client: ChainClient,
    pub wallets: WalletSet,
    pub artifacts: ContractArtifacts,
}

impl Environment {
    /// Load the network, decode its keys, connect and read artifacts.
    ///
    /// Artifacts are optional for commands that never deploy.
    pub async fn connect(config: &Config, require_artifacts: bool) -> Result<Self> {
        let network = config.network_descriptor()?;
        let wallets = network
            .wallets()
            .wrap_err("Failed to decode network private keys")?;

        let client = ChainClient::connect(network, config.retry, config.tx_timeout)
            .await
            .wrap_err("Failed to connect to network")?;

        let artifacts = if require_artifacts {
            ContractArtifacts::from_dir(&config.artifacts_dir).wrap_err_with(|| {
                format!(
                    "Failed to load contract artifacts from {}",
                    config.artifacts_dir.display()
                )
            })?
        } else {
            ContractArtifacts::new()
        };

        info!(
            network = %config.network,
            wallets = wallets.len(),
            "Environment ready"
        );

        Ok(Self {
            client,
            wallets,
            artifacts,
        })
    }

    pub fn deployer(&self) -> Result<ContractDeployer<'_>> {
        ContractDeployer::new(&self.client, &self.artifacts)
            .wrap_err("No deployer for this network")
    }
}
