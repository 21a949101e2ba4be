//! Contract deployment on EVM chains
//!
//! Every deployment follows the same steps: encode the kind-specific
//! constructor arguments, take the adjusted gas price, submit the creation
//! transaction signed by the caller wallet, and wrap the result in a handle.
//! Errors propagate immediately; retries happen only inside the client.

use alloy::{
    primitives::{Address, TxHash},
    sol_types::SolConstructor,
};
use tracing::{debug, info};

use crate::artifacts::{ContractArtifacts, ContractKind};
use crate::client::ChainClient;
use crate::contracts::{FluxAggregator, OffchainAggregator};
use crate::error::{DeployError, Result};
use crate::gas;
use crate::handles::{
    FluxAggregatorHandle, OffchainAggregatorHandle, StorageHandle, TokenHandle, VrfHandle,
};
use crate::options::{FluxAggregatorOptions, OffchainAggregatorOptions};
use crate::wallet::Wallet;

/// Deployer for EVM-family networks
#[derive(Debug, Clone, Copy)]
pub struct EvmContractDeployer<'a> {
    client: &'a ChainClient,
    artifacts: &'a ContractArtifacts,
}

impl<'a> EvmContractDeployer<'a> {
    pub fn new(client: &'a ChainClient, artifacts: &'a ContractArtifacts) -> Self {
        Self { client, artifacts }
    }

    pub fn client(&self) -> &'a ChainClient {
        self.client
    }

    /// Suggested gas price with the per-chain markup applied
    pub async fn adjust_gas_price(&self) -> Result<u128> {
        gas::adjust_gas_price(self.client).await
    }

    async fn deploy_contract(
        &self,
        from: &Wallet,
        kind: ContractKind,
        constructor_args: Vec<u8>,
    ) -> Result<(Address, TxHash)> {
        let init_code = self.artifacts.init_code(kind, &constructor_args)?;
        let gas_price = self.adjust_gas_price().await?;

        debug!(
            contract = %kind,
            from = %from.address(),
            init_code_len = init_code.len(),
            gas_price = %gas_price,
            "Deploying contract"
        );
        self.client.deploy(from, kind, init_code, gas_price).await
    }

    fn fee_token(&self) -> Result<Address> {
        let network = self.client.network();
        network
            .fee_token_address()
            .ok_or_else(|| DeployError::MissingFeeToken {
                network: network.id().to_string(),
            })
    }

    /// Deploy a fee token and record its address on the network descriptor
    pub async fn deploy_token(&self, from: &Wallet) -> Result<TokenHandle<'a>> {
        let (address, tx_hash) = self
            .deploy_contract(from, ContractKind::Token, Vec::new())
            .await?;
        self.client.network().record_fee_token_address(address);
        Ok(TokenHandle::new(
            self.client,
            from.clone(),
            address,
            Some(tx_hash),
        ))
    }

    /// Bind to a fee token that is already deployed. Sends nothing.
    pub fn instance_token(&self, address: Address, from: &Wallet) -> TokenHandle<'a> {
        debug!(token = %address, "Binding existing fee token");
        TokenHandle::new(self.client, from.clone(), address, None)
    }

    pub async fn deploy_flux_aggregator(
        &self,
        from: &Wallet,
        options: &FluxAggregatorOptions,
    ) -> Result<FluxAggregatorHandle<'a>> {
        let args = FluxAggregator::constructorCall {
            link: self.fee_token()?,
            paymentAmount: options.payment_amount,
            timeout: options.timeout,
            validator: options.validator,
            minSubmissionValue: options.min_submission_value,
            maxSubmissionValue: options.max_submission_value,
            decimals: options.decimals,
            description: options.description.clone(),
        }
        .abi_encode();

        let (address, tx_hash) = self
            .deploy_contract(from, ContractKind::FluxAggregator, args)
            .await?;
        Ok(FluxAggregatorHandle::new(
            self.client,
            from.clone(),
            address,
            tx_hash,
        ))
    }

    pub async fn deploy_offchain_aggregator(
        &self,
        from: &Wallet,
        options: &OffchainAggregatorOptions,
    ) -> Result<OffchainAggregatorHandle<'a>> {
        let args = OffchainAggregator::constructorCall {
            maximumGasPrice: options.maximum_gas_price,
            reasonableGasPrice: options.reasonable_gas_price,
            microLinkPerEth: options.micro_link_per_eth,
            linkGweiPerObservation: options.link_gwei_per_observation,
            linkGweiPerTransmission: options.link_gwei_per_transmission,
            link: self.fee_token()?,
            minAnswer: options.minimum_answer,
            maxAnswer: options.maximum_answer,
            billingAccessController: options.billing_access_controller,
            requesterAccessController: options.requester_access_controller,
            decimals: options.decimals,
            description: options.description.clone(),
        }
        .abi_encode();

        let (address, tx_hash) = self
            .deploy_contract(from, ContractKind::OffchainAggregator, args)
            .await?;
        info!(aggregator = %address, description = %options.description, "OCR aggregator ready");
        Ok(OffchainAggregatorHandle::new(
            self.client,
            from.clone(),
            address,
            tx_hash,
        ))
    }

    pub async fn deploy_storage(&self, from: &Wallet) -> Result<StorageHandle<'a>> {
        let (address, tx_hash) = self
            .deploy_contract(from, ContractKind::Storage, Vec::new())
            .await?;
        Ok(StorageHandle::new(self.client, from.clone(), address, tx_hash))
    }

    pub async fn deploy_vrf(&self, from: &Wallet) -> Result<VrfHandle<'a>> {
        let (address, tx_hash) = self
            .deploy_contract(from, ContractKind::Vrf, Vec::new())
            .await?;
        Ok(VrfHandle::new(self.client, from.clone(), address, tx_hash))
    }
}
