//! OCR-Deployer: Contract Deployment Layer for Oracle Test Networks
//!
//! This crate deploys and drives the contracts an off-chain reporting test
//! network needs, on any EVM-compatible chain:
//!
//! - **Networks** - Descriptors for known networks plus custom ids, loaded from env
//! - **Wallets** - Ordered signing wallets with a movable default
//! - **Client** - HTTP provider per network with retry and receipt timeout
//! - **Gas** - Per-chain gas price markup for slow-finality chains (RSK)
//! - **Deployer** - Uniform deployment of fee token, flux aggregator, OCR
//!   aggregator, storage and VRF contracts, dispatched on chain family
//! - **Handles** - Typed wrappers around deployed contracts
//!
//! ## Usage
//!
//! ```ignore
//! let network = NetworkDescriptor::from_env(NetworkId::RskRegtest)?;
//! let wallets = network.wallets()?;
//! let client = ChainClient::connect(network, RetryPolicy::default(), DEFAULT_TX_TIMEOUT).await?;
//! let artifacts = ContractArtifacts::from_dir("./artifacts")?;
//!
//! let deployer = ContractDeployer::new(&client, &artifacts)?;
//! let token = deployer.deploy_token(wallets.default_wallet()?).await?;
//! let ocr = deployer
//!     .deploy_offchain_aggregator(wallets.default_wallet()?, &OffchainAggregatorOptions::default())
//!     .await?;
//! ```

pub mod artifacts;
pub mod client;
pub mod contracts;
pub mod deployer;
pub mod error;
pub mod gas;
pub mod handles;
pub mod network;
pub mod options;
pub mod redact;
pub mod retry;
pub mod wallet;

// Re-export commonly used items at the crate root
pub use artifacts::{ContractArtifacts, ContractKind};
pub use client::{ChainClient, FundingReceipt, DEFAULT_TX_TIMEOUT};
pub use deployer::{ContractDeployer, EvmContractDeployer};
pub use error::{DeployError, Result, RpcFailure};
pub use gas::{adjust_gas_price, GasPricePolicy, SLOW_FINALITY_CHAIN_IDS};
pub use handles::{
    ConfigDetails, FluxAggregatorHandle, OffchainAggregatorHandle, RoundData, StorageHandle,
    TokenHandle, VrfHandle,
};
pub use network::{ChainFamily, KeySource, NetworkDescriptor, NetworkId};
pub use options::{
    FluxAggregatorOptions, OcrConfigInput, OffchainAggregatorConfig, OffchainAggregatorOptions,
    OracleIdentity,
};
pub use redact::Redacted;
pub use retry::{classify_error, classify_rpc_error, ErrorClass, RetryPolicy};
pub use wallet::{Wallet, WalletSet};
