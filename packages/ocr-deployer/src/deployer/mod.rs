//! Chain-family dispatch for contract deployment
//!
//! [`ContractDeployer::new`] picks the implementation once, from the client's
//! chain family. Adding a family means adding a variant here and a module next
//! to [`evm`].

pub mod evm;

pub use evm::EvmContractDeployer;

use alloy::primitives::Address;

use crate::artifacts::ContractArtifacts;
use crate::client::ChainClient;
use crate::error::{DeployError, Result};
use crate::handles::{
    FluxAggregatorHandle, OffchainAggregatorHandle, StorageHandle, TokenHandle, VrfHandle,
};
use crate::network::ChainFamily;
use crate::options::{FluxAggregatorOptions, OffchainAggregatorOptions};
use crate::wallet::Wallet;

/// Deployer for whichever chain family the client talks to
#[derive(Debug, Clone, Copy)]
pub enum ContractDeployer<'a> {
    Evm(EvmContractDeployer<'a>),
}

impl<'a> ContractDeployer<'a> {
    /// Fails with [`DeployError::UnsupportedClient`] when the client's network
    /// has no known chain family
    pub fn new(client: &'a ChainClient, artifacts: &'a ContractArtifacts) -> Result<Self> {
        match client.family() {
            Some(ChainFamily::Evm) => Ok(ContractDeployer::Evm(EvmContractDeployer::new(
                client, artifacts,
            ))),
            None => Err(DeployError::UnsupportedClient {
                network: client.network().id().to_string(),
            }),
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            ContractDeployer::Evm(_) => ChainFamily::Evm,
        }
    }

    pub async fn adjust_gas_price(&self) -> Result<u128> {
        match self {
            ContractDeployer::Evm(d) => d.adjust_gas_price().await,
        }
    }

    pub async fn deploy_token(&self, from: &Wallet) -> Result<TokenHandle<'a>> {
        match self {
            ContractDeployer::Evm(d) => d.deploy_token(from).await,
        }
    }

    pub fn instance_token(&self, address: Address, from: &Wallet) -> TokenHandle<'a> {
        match self {
            ContractDeployer::Evm(d) => d.instance_token(address, from),
        }
    }

    pub async fn deploy_flux_aggregator(
        &self,
        from: &Wallet,
        options: &FluxAggregatorOptions,
    ) -> Result<FluxAggregatorHandle<'a>> {
        match self {
            ContractDeployer::Evm(d) => d.deploy_flux_aggregator(from, options).await,
        }
    }

    pub async fn deploy_offchain_aggregator(
        &self,
        from: &Wallet,
        options: &OffchainAggregatorOptions,
    ) -> Result<OffchainAggregatorHandle<'a>> {
        match self {
            ContractDeployer::Evm(d) => d.deploy_offchain_aggregator(from, options).await,
        }
    }

    pub async fn deploy_storage(&self, from: &Wallet) -> Result<StorageHandle<'a>> {
        match self {
            ContractDeployer::Evm(d) => d.deploy_storage(from).await,
        }
    }

    pub async fn deploy_vrf(&self, from: &Wallet) -> Result<VrfHandle<'a>> {
        match self {
            ContractDeployer::Evm(d) => d.deploy_vrf(from).await,
        }
    }
}
