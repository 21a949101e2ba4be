//! Integration tests against a live development chain
//!
//! Run with: cargo test --test deploy_integration -- --ignored --nocapture
//!
//! Prerequisites:
//! - Anvil running on DEPLOY_TEST_RPC_URL (default http://localhost:8545)
//! - DEPLOY_TEST_ARTIFACTS_DIR pointing at compiled LinkToken / Store artifacts
//! - For the slow-finality test, a second Anvil started with
//!   `anvil --chain-id 31 --gas-price 1000000000 --port 8546` and
//!   DEPLOY_TEST_RSK_RPC_URL pointing at it

use alloy::primitives::U256;
use alloy::providers::Provider;
use ocr_deployer::{
    ChainClient, ContractArtifacts, ContractDeployer, KeySource, NetworkDescriptor, NetworkId,
    Redacted, RetryPolicy, DEFAULT_TX_TIMEOUT,
};

mod helpers {
    use super::*;

    /// Anvil development account 0
    pub const ANVIL_KEY_0: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    pub struct TestConfig {
        pub rpc_url: String,
        pub rsk_rpc_url: Option<String>,
        pub artifacts_dir: String,
        pub private_key: String,
    }

    impl TestConfig {
        pub fn from_env() -> Option<Self> {
            Some(TestConfig {
                rpc_url: std::env::var("DEPLOY_TEST_RPC_URL")
                    .unwrap_or_else(|_| "http://localhost:8545".to_string()),
                rsk_rpc_url: std::env::var("DEPLOY_TEST_RSK_RPC_URL").ok(),
                artifacts_dir: std::env::var("DEPLOY_TEST_ARTIFACTS_DIR").ok()?,
                private_key: std::env::var("DEPLOY_TEST_PRIVATE_KEY")
                    .unwrap_or_else(|_| ANVIL_KEY_0.to_string()),
            })
        }
    }

    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info,ocr_deployer=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    pub fn network(id: NetworkId, url: &str, chain_id: u64, key: &str) -> NetworkDescriptor {
        NetworkDescriptor::new(id, url, U256::from(chain_id))
            .with_key_source(KeySource::Inline(vec![Redacted(key.to_string())]))
    }
}

#[tokio::test]
#[ignore]
async fn test_deploy_token_then_instance() {
    helpers::init_tracing();
    let config = helpers::TestConfig::from_env().expect("DEPLOY_TEST_ARTIFACTS_DIR required");

    let network = helpers::network(
        NetworkId::EthereumHardhat,
        &config.rpc_url,
        31337,
        &config.private_key,
    );
    let wallets = network.wallets().unwrap();
    let from = wallets.default_wallet().unwrap();

    let client = ChainClient::connect(network, RetryPolicy::default(), DEFAULT_TX_TIMEOUT)
        .await
        .unwrap();
    let artifacts = ContractArtifacts::from_dir(&config.artifacts_dir).unwrap();
    let deployer = ContractDeployer::new(&client, &artifacts).unwrap();

    let token = deployer.deploy_token(from).await.unwrap();
    assert!(token.deploy_tx().is_some());
    assert_eq!(client.network().fee_token_address(), Some(token.address()));

    let bound = deployer.instance_token(token.address(), from);
    assert_eq!(bound.address(), token.address());
    assert_eq!(bound.deploy_tx(), None);

    // The whole supply is minted to the deployer
    let balance = bound.balance_of(from.address()).await.unwrap();
    assert!(balance > U256::ZERO);
    assert_eq!(balance, token.balance_of(from.address()).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_storage_set_get() {
    helpers::init_tracing();
    let config = helpers::TestConfig::from_env().expect("DEPLOY_TEST_ARTIFACTS_DIR required");

    let network = helpers::network(
        NetworkId::EthereumHardhat,
        &config.rpc_url,
        31337,
        &config.private_key,
    );
    let wallets = network.wallets().unwrap();
    let client = ChainClient::connect(network, RetryPolicy::default(), DEFAULT_TX_TIMEOUT)
        .await
        .unwrap();
    let artifacts = ContractArtifacts::from_dir(&config.artifacts_dir).unwrap();
    let deployer = ContractDeployer::new(&client, &artifacts).unwrap();

    let storage = deployer
        .deploy_storage(wallets.default_wallet().unwrap())
        .await
        .unwrap();
    storage.set(U256::from(42)).await.unwrap();
    assert_eq!(storage.get().await.unwrap(), U256::from(42));
}

#[tokio::test]
#[ignore]
async fn test_slow_finality_chain_storage_gas_price() {
    helpers::init_tracing();
    let config = helpers::TestConfig::from_env().expect("DEPLOY_TEST_ARTIFACTS_DIR required");
    let Some(rsk_url) = config.rsk_rpc_url.clone() else {
        eprintln!("DEPLOY_TEST_RSK_RPC_URL not set, skipping");
        return;
    };

    let network = helpers::network(NetworkId::RskTestnet, &rsk_url, 31, &config.private_key);
    let wallets = network.wallets().unwrap();
    let client = ChainClient::connect(network, RetryPolicy::default(), DEFAULT_TX_TIMEOUT)
        .await
        .unwrap();
    let artifacts = ContractArtifacts::from_dir(&config.artifacts_dir).unwrap();
    let deployer = ContractDeployer::new(&client, &artifacts).unwrap();

    let suggested = client.suggest_gas_price().await.unwrap();
    assert_eq!(suggested, 1_000_000_000, "anvil must run with --gas-price 1000000000");

    let storage = deployer
        .deploy_storage(wallets.default_wallet().unwrap())
        .await
        .unwrap();
    let tx_hash = storage.deploy_tx().unwrap();

    let receipt = client
        .provider()
        .get_transaction_receipt(tx_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receipt.effective_gas_price, 1_020_000_000);
    assert_eq!(client.network().fee_token_address(), None);
}
