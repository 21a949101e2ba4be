//! Typed handles to deployed contracts
//!
//! A handle borrows the [`ChainClient`] it was deployed through and keeps the
//! caller wallet, so every transaction it sends is signed by the wallet that
//! created it. Reads go through the client's read-only provider; writes go
//! through [`ChainClient::send_transaction`] and inherit its retry policy and
//! receipt timeout.

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, FixedBytes, TxHash, I256, U256},
    providers::RootProvider,
    rpc::types::TransactionRequest,
    sol_types::SolCall,
    transports::http::{Client, Http},
};
use tracing::info;

use crate::client::{ChainClient, FundingReceipt};
use crate::contracts::{FluxAggregator, LinkToken, OffchainAggregator, Store, VRF};
use crate::error::Result;
use crate::options::{OcrConfigInput, OracleIdentity};
use crate::wallet::Wallet;

type ReadProvider<'a> = &'a RootProvider<Http<Client>>;

/// State every handle shares
#[derive(Debug, Clone)]
struct Bound<'a> {
    address: Address,
    client: &'a ChainClient,
    caller: Wallet,
    deploy_tx: Option<TxHash>,
}

impl<'a> Bound<'a> {
    async fn send<C: SolCall>(&self, call: C, label: &str) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_input(call.abi_encode());
        let receipt = self
            .client
            .send_transaction(&self.caller, tx, label)
            .await?;
        Ok(receipt.transaction_hash)
    }
}

macro_rules! handle_accessors {
    ($handle:ident) => {
        impl<'a> $handle<'a> {
            pub fn address(&self) -> Address {
                self.bound.address
            }

            /// Deployment transaction; `None` for handles bound to an existing address
            pub fn deploy_tx(&self) -> Option<TxHash> {
                self.bound.deploy_tx
            }

            pub fn caller(&self) -> &Wallet {
                &self.bound.caller
            }

            pub fn client(&self) -> &'a ChainClient {
                self.bound.client
            }
        }
    };
}

// ============================================================================
// Fee Token
// ============================================================================

/// ERC-677 fee token
#[derive(Debug, Clone)]
pub struct TokenHandle<'a> {
    bound: Bound<'a>,
}

handle_accessors!(TokenHandle);

impl<'a> TokenHandle<'a> {
    pub(crate) fn new(
        client: &'a ChainClient,
        caller: Wallet,
        address: Address,
        deploy_tx: Option<TxHash>,
    ) -> Self {
        Self {
            bound: Bound {
                address,
                client,
                caller,
                deploy_tx,
            },
        }
    }

    pub fn instance(&self) -> LinkToken::LinkTokenInstance<Http<Client>, ReadProvider<'a>> {
        LinkToken::new(self.bound.address, self.bound.client.provider())
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256> {
        let result = self
            .bound
            .client
            .read("LinkToken", "balanceOf", self.address(), || async move {
                self.instance().balanceOf(owner).call().await
            })
            .await?;
        Ok(result._0)
    }

    pub async fn name(&self) -> Result<String> {
        let result = self
            .bound
            .client
            .read("LinkToken", "name", self.address(), || async move {
                self.instance().name().call().await
            })
            .await?;
        Ok(result._0)
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash> {
        let tx_hash = self
            .bound
            .send(LinkToken::transferCall { to, value: amount }, "LinkToken.transfer")
            .await?;
        info!(token = %self.address(), to = %to, amount = %amount, "Transferred tokens");
        Ok(tx_hash)
    }

    /// ERC-677 transfer that notifies `to` with `data`
    pub async fn transfer_and_call(
        &self,
        to: Address,
        amount: U256,
        data: Bytes,
    ) -> Result<TxHash> {
        self.bound
            .send(
                LinkToken::transferAndCallCall {
                    to,
                    value: amount,
                    data,
                },
                "LinkToken.transferAndCall",
            )
            .await
    }
}

// ============================================================================
// Flux Aggregator
// ============================================================================

/// Latest round of a flux aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: U256,
    pub answer: I256,
    pub started_at: U256,
    pub updated_at: U256,
    pub answered_in_round: U256,
}

#[derive(Debug, Clone)]
pub struct FluxAggregatorHandle<'a> {
    bound: Bound<'a>,
}

handle_accessors!(FluxAggregatorHandle);

impl<'a> FluxAggregatorHandle<'a> {
    pub(crate) fn new(
        client: &'a ChainClient,
        caller: Wallet,
        address: Address,
        deploy_tx: TxHash,
    ) -> Self {
        Self {
            bound: Bound {
                address,
                client,
                caller,
                deploy_tx: Some(deploy_tx),
            },
        }
    }

    pub fn instance(
        &self,
    ) -> FluxAggregator::FluxAggregatorInstance<Http<Client>, ReadProvider<'a>> {
        FluxAggregator::new(self.bound.address, self.bound.client.provider())
    }

    /// Send native value and fee tokens to the aggregator, then make it
    /// account for the new tokens
    pub async fn fund(&self, native_amount: U256, token_amount: U256) -> Result<FundingReceipt> {
        let funding = self
            .bound
            .client
            .fund(&self.bound.caller, self.address(), native_amount, token_amount)
            .await?;
        self.update_available_funds().await?;
        Ok(funding)
    }

    pub async fn update_available_funds(&self) -> Result<TxHash> {
        self.bound
            .send(
                FluxAggregator::updateAvailableFundsCall {},
                "FluxAggregator.updateAvailableFunds",
            )
            .await
    }

    pub async fn available_funds(&self) -> Result<U256> {
        let result = self
            .bound
            .client
            .read("FluxAggregator", "availableFunds", self.address(), || async move {
                self.instance().availableFunds().call().await
            })
            .await?;
        Ok(U256::from(result._0))
    }

    pub async fn change_oracles(
        &self,
        removed: Vec<Address>,
        added: Vec<Address>,
        added_admins: Vec<Address>,
        min_submissions: u32,
        max_submissions: u32,
        restart_delay: u32,
    ) -> Result<TxHash> {
        let count = added.len();
        let tx_hash = self
            .bound
            .send(
                FluxAggregator::changeOraclesCall {
                    removed,
                    added,
                    addedAdmins: added_admins,
                    minSubmissions: min_submissions,
                    maxSubmissions: max_submissions,
                    restartDelay: restart_delay,
                },
                "FluxAggregator.changeOracles",
            )
            .await?;
        info!(aggregator = %self.address(), added = count, "Changed flux oracles");
        Ok(tx_hash)
    }

    pub async fn get_oracles(&self) -> Result<Vec<Address>> {
        let result = self
            .bound
            .client
            .read("FluxAggregator", "getOracles", self.address(), || async move {
                self.instance().getOracles().call().await
            })
            .await?;
        Ok(result._0)
    }

    pub async fn latest_round_data(&self) -> Result<RoundData> {
        let result = self
            .bound
            .client
            .read("FluxAggregator", "latestRoundData", self.address(), || async move {
                self.instance().latestRoundData().call().await
            })
            .await?;
        Ok(RoundData {
            round_id: U256::from(result.roundId),
            answer: result.answer,
            started_at: result.startedAt,
            updated_at: result.updatedAt,
            answered_in_round: U256::from(result.answeredInRound),
        })
    }

    pub async fn description(&self) -> Result<String> {
        let result = self
            .bound
            .client
            .read("FluxAggregator", "description", self.address(), || async move {
                self.instance().description().call().await
            })
            .await?;
        Ok(result._0)
    }
}

// ============================================================================
// Off-chain Reporting Aggregator
// ============================================================================

/// Result of `latestConfigDetails`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDetails {
    pub config_count: u32,
    pub block_number: u32,
    pub config_digest: FixedBytes<16>,
}

#[derive(Debug, Clone)]
pub struct OffchainAggregatorHandle<'a> {
    bound: Bound<'a>,
}

handle_accessors!(OffchainAggregatorHandle);

impl<'a> OffchainAggregatorHandle<'a> {
    pub(crate) fn new(
        client: &'a ChainClient,
        caller: Wallet,
        address: Address,
        deploy_tx: TxHash,
    ) -> Self {
        Self {
            bound: Bound {
                address,
                client,
                caller,
                deploy_tx: Some(deploy_tx),
            },
        }
    }

    pub fn instance(
        &self,
    ) -> OffchainAggregator::OffchainAggregatorInstance<Http<Client>, ReadProvider<'a>> {
        OffchainAggregator::new(self.bound.address, self.bound.client.provider())
    }

    /// Send native value and fee tokens to the aggregator
    pub async fn fund(&self, native_amount: U256, token_amount: U256) -> Result<FundingReceipt> {
        self.bound
            .client
            .fund(&self.bound.caller, self.address(), native_amount, token_amount)
            .await
    }

    /// Fee token the aggregator pays oracles in
    pub async fn link_token(&self) -> Result<Address> {
        let result = self
            .bound
            .client
            .read("OffchainAggregator", "getLinkToken", self.address(), || async move {
                self.instance().getLinkToken().call().await
            })
            .await?;
        Ok(result._0)
    }

    pub async fn set_payees(
        &self,
        transmitters: Vec<Address>,
        payees: Vec<Address>,
    ) -> Result<TxHash> {
        let count = transmitters.len();
        let tx_hash = self
            .bound
            .send(
                OffchainAggregator::setPayeesCall {
                    transmitters,
                    payees,
                },
                "OffchainAggregator.setPayees",
            )
            .await?;
        info!(aggregator = %self.address(), payees = count, "Set OCR payees");
        Ok(tx_hash)
    }

    /// Set each oracle's payee for its transmitter
    pub async fn set_payees_for(&self, oracles: &[OracleIdentity]) -> Result<TxHash> {
        self.set_payees(
            oracles.iter().map(|o| o.transmitter).collect(),
            oracles.iter().map(|o| o.payee).collect(),
        )
        .await
    }

    pub async fn set_config(&self, input: &OcrConfigInput) -> Result<TxHash> {
        let tx_hash = self
            .bound
            .send(
                OffchainAggregator::setConfigCall {
                    signers: input.signers.clone(),
                    transmitters: input.transmitters.clone(),
                    threshold: input.threshold,
                    encodedConfigVersion: input.encoded_config_version,
                    encoded: input.encoded.clone(),
                },
                "OffchainAggregator.setConfig",
            )
            .await?;
        info!(
            aggregator = %self.address(),
            oracles = input.signers.len(),
            threshold = input.threshold,
            "Set OCR config"
        );
        Ok(tx_hash)
    }

    pub async fn latest_config_details(&self) -> Result<ConfigDetails> {
        let result = self
            .bound
            .client
            .read("OffchainAggregator", "latestConfigDetails", self.address(), || async move {
                self.instance().latestConfigDetails().call().await
            })
            .await?;
        Ok(ConfigDetails {
            config_count: result.configCount,
            block_number: result.blockNumber,
            config_digest: result.configDigest,
        })
    }

    pub async fn transmitters(&self) -> Result<Vec<Address>> {
        let result = self
            .bound
            .client
            .read("OffchainAggregator", "transmitters", self.address(), || async move {
                self.instance().transmitters().call().await
            })
            .await?;
        Ok(result._0)
    }

    pub async fn latest_answer(&self) -> Result<I256> {
        let result = self
            .bound
            .client
            .read("OffchainAggregator", "latestAnswer", self.address(), || async move {
                self.instance().latestAnswer().call().await
            })
            .await?;
        Ok(result._0)
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone)]
pub struct StorageHandle<'a> {
    bound: Bound<'a>,
}

handle_accessors!(StorageHandle);

impl<'a> StorageHandle<'a> {
    pub(crate) fn new(
        client: &'a ChainClient,
        caller: Wallet,
        address: Address,
        deploy_tx: TxHash,
    ) -> Self {
        Self {
            bound: Bound {
                address,
                client,
                caller,
                deploy_tx: Some(deploy_tx),
            },
        }
    }

    pub fn instance(&self) -> Store::StoreInstance<Http<Client>, ReadProvider<'a>> {
        Store::new(self.bound.address, self.bound.client.provider())
    }

    pub async fn set(&self, value: U256) -> Result<TxHash> {
        self.bound.send(Store::setCall { value }, "Store.set").await
    }

    pub async fn get(&self) -> Result<U256> {
        let result = self
            .bound
            .client
            .read("Store", "get", self.address(), || async move {
                self.instance().get().call().await
            })
            .await?;
        Ok(result._0)
    }
}

// ============================================================================
// VRF
// ============================================================================

#[derive(Debug, Clone)]
pub struct VrfHandle<'a> {
    bound: Bound<'a>,
}

handle_accessors!(VrfHandle);

impl<'a> VrfHandle<'a> {
    pub(crate) fn new(
        client: &'a ChainClient,
        caller: Wallet,
        address: Address,
        deploy_tx: TxHash,
    ) -> Self {
        Self {
            bound: Bound {
                address,
                client,
                caller,
                deploy_tx: Some(deploy_tx),
            },
        }
    }

    pub fn instance(&self) -> VRF::VRFInstance<Http<Client>, ReadProvider<'a>> {
        VRF::new(self.bound.address, self.bound.client.provider())
    }

    /// Verify a VRF proof and return the randomness it commits to
    pub async fn random_value_from_proof(&self, proof: Bytes) -> Result<U256> {
        let result = self
            .bound
            .client
            .read("VRF", "randomValueFromVRFProof", self.address(), || {
                let proof = proof.clone();
                async move { self.instance().randomValueFromVRFProof(proof).call().await }
            })
            .await?;
        Ok(result._0)
    }
}
