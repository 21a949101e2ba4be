//! EVM chain client
//!
//! One [`ChainClient`] per network. It owns the HTTP provider, the network
//! descriptor, the retry policy and the receipt timeout. Transactions are
//! signed locally with the caller's wallet and submitted as raw bytes.
//!
//! # Transaction Building
//!
//! Nonce, gas limit and chain ID are filled from the node, then the request is
//! signed exactly once. Retries resend those same signed bytes, so a lost
//! response can never turn into a second deployment. Gas price is always set
//! explicitly (legacy pricing) from [`crate::gas::adjust_gas_price`], since
//! RSK nodes do not implement EIP-1559 fee history.

use alloy::{
    consensus::TxEnvelope,
    eips::eip2718::Encodable2718,
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxHash, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{TransactionReceipt, TransactionRequest},
    sol_types::SolCall,
    transports::{
        http::{Client, Http},
        RpcError, TransportErrorKind,
    },
};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::artifacts::ContractKind;
use crate::contracts::LinkToken;
use crate::error::{DeployError, Result, RpcFailure};
use crate::gas::{self, GasPricePolicy};
use crate::network::{ChainFamily, NetworkDescriptor};
use crate::retry::{ErrorClass, RetryPolicy};
use crate::wallet::Wallet;

/// Default bound on waiting for a transaction receipt
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(120);

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Transactions sent by [`ChainClient::fund`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FundingReceipt {
    pub native_tx: Option<TxHash>,
    pub token_tx: Option<TxHash>,
}

/// Connected client for one EVM network
pub struct ChainClient {
    network: NetworkDescriptor,
    provider: RootProvider<Http<Client>>,
    url: Url,
    retry: RetryPolicy,
    tx_timeout: Duration,
    gas_policy: GasPricePolicy,
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("network", &self.network.id())
            .field("url", &self.url.as_str())
            .field("chain_id", &self.network.chain_id())
            .field("retry", &self.retry)
            .field("tx_timeout", &self.tx_timeout)
            .finish()
    }
}

impl ChainClient {
    /// Dial the network and check its chain ID.
    ///
    /// A live chain ID that differs from the configured one is logged, not
    /// rejected; [`ChainClient::chain_id`] keeps reporting the configured value.
    pub async fn connect(
        network: NetworkDescriptor,
        retry: RetryPolicy,
        tx_timeout: Duration,
    ) -> Result<Self> {
        let client = Self::connect_lazy(network, retry, tx_timeout)?;
        let live_chain_id = client.live_chain_id().await?;

        let configured = client.network.chain_id();
        if U256::from(live_chain_id) != configured {
            warn!(
                network = %client.network.id(),
                configured = %configured,
                live = live_chain_id,
                "Chain ID reported by node differs from configured chain ID"
            );
        }

        info!(
            network = %client.network.id(),
            rpc_url = %client.url,
            chain_id = %configured,
            "Connected to chain"
        );
        Ok(client)
    }

    /// Build the client without touching the network
    pub fn connect_lazy(
        network: NetworkDescriptor,
        retry: RetryPolicy,
        tx_timeout: Duration,
    ) -> Result<Self> {
        let url = Url::parse(network.rpc_url()).map_err(|e| DeployError::Connection {
            url: network.rpc_url().to_string(),
            reason: RpcFailure::permanent(e.to_string()),
        })?;
        let provider = ProviderBuilder::new().on_http(url.clone());

        debug!(network = %network.id(), rpc_url = %url, "Created chain client");

        Ok(Self {
            network,
            provider,
            url,
            retry,
            tx_timeout,
            gas_policy: GasPricePolicy::default(),
        })
    }

    pub fn with_gas_policy(mut self, gas_policy: GasPricePolicy) -> Self {
        self.gas_policy = gas_policy;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn network(&self) -> &NetworkDescriptor {
        &self.network
    }

    /// Configured chain ID of the network
    pub fn chain_id(&self) -> U256 {
        self.network.chain_id()
    }

    pub fn family(&self) -> Option<ChainFamily> {
        self.network.family()
    }

    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn tx_timeout(&self) -> Duration {
        self.tx_timeout
    }

    pub fn gas_policy(&self) -> &GasPricePolicy {
        &self.gas_policy
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Chain ID reported by the node
    pub async fn live_chain_id(&self) -> Result<u64> {
        self.retry
            .run("eth_chainId", || async move {
                self.provider
                    .get_chain_id()
                    .await
                    .map_err(|e| DeployError::Connection {
                        url: self.url.to_string(),
                        reason: RpcFailure::from(e),
                    })
            })
            .await
    }

    /// Node's suggested gas price, before any per-chain adjustment
    pub async fn suggest_gas_price(&self) -> Result<u128> {
        self.retry
            .run("eth_gasPrice", || async move {
                self.provider
                    .get_gas_price()
                    .await
                    .map_err(|e| DeployError::GasPriceFetch(RpcFailure::from(e)))
            })
            .await
    }

    /// Native balance of `address`
    pub async fn balance(&self, address: Address) -> Result<U256> {
        self.retry
            .run("eth_getBalance", || async move {
                self.provider
                    .get_balance(address)
                    .await
                    .map_err(|e| DeployError::ContractCall {
                        contract: "account",
                        method: "balance",
                        address,
                        reason: RpcFailure::from(e),
                    })
            })
            .await
    }

    /// Run a read-only contract call under the retry policy
    pub(crate) async fn read<T, E, F, Fut>(
        &self,
        contract: &'static str,
        method: &'static str,
        address: Address,
        call: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<RpcFailure>,
    {
        self.retry
            .run(method, || {
                let fut = call();
                async move {
                    fut.await.map_err(|e| DeployError::ContractCall {
                        contract,
                        method,
                        address,
                        reason: e.into(),
                    })
                }
            })
            .await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Sign `tx` with `wallet`, submit it and wait for a successful receipt.
    ///
    /// A missing gas price is filled with the adjusted price for this chain.
    /// The transaction is signed once; only the submission of those bytes is
    /// retried. The receipt wait is bounded by the client's transaction timeout.
    pub async fn send_transaction(
        &self,
        wallet: &Wallet,
        mut tx: TransactionRequest,
        label: &str,
    ) -> Result<TransactionReceipt> {
        if tx.from.is_none() {
            tx.set_from(wallet.address());
        }
        if tx.gas_price.is_none() && tx.max_fee_per_gas.is_none() {
            tx.set_gas_price(gas::adjust_gas_price(self).await?);
        }

        let envelope = self.sign(wallet, tx, label).await?;
        let tx_hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());

        let provider = &self.provider;
        submit_signed(&self.retry, label, tx_hash, raw, |raw| async move {
            provider
                .send_raw_transaction(&raw)
                .await
                .map(|_| ())
                .map_err(|e| DeployError::TransactionSubmission {
                    context: label.to_string(),
                    reason: RpcFailure::from(e),
                })
        })
        .await?;

        debug!(label, tx_hash = %tx_hash, from = %wallet.address(), "Transaction sent");

        let receipt = tokio::time::timeout(self.tx_timeout, self.poll_receipt(tx_hash, label))
            .await
            .map_err(|_| DeployError::TransactionSubmission {
                context: label.to_string(),
                reason: RpcFailure::permanent(format!(
                    "no receipt for {} after {:?}",
                    tx_hash, self.tx_timeout
                )),
            })??;

        if !receipt.status() {
            return Err(DeployError::TransactionSubmission {
                context: label.to_string(),
                reason: RpcFailure::permanent(format!("transaction {} reverted", tx_hash)),
            });
        }

        debug!(
            label,
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            gas_used = %receipt.gas_used,
            "Transaction confirmed"
        );
        Ok(receipt)
    }

    /// Fill nonce, chain ID and gas limit from the node, then sign
    async fn sign(
        &self,
        wallet: &Wallet,
        mut tx: TransactionRequest,
        label: &str,
    ) -> Result<TxEnvelope> {
        let from = wallet.address();
        let submission = |e: RpcError<TransportErrorKind>| DeployError::TransactionSubmission {
            context: label.to_string(),
            reason: RpcFailure::from(e),
        };

        if tx.nonce.is_none() {
            let nonce = self
                .retry
                .run("eth_getTransactionCount", || async move {
                    self.provider
                        .get_transaction_count(from)
                        .pending()
                        .await
                        .map_err(submission)
                })
                .await?;
            tx.set_nonce(nonce);
        }

        if tx.chain_id.is_none() {
            tx.set_chain_id(self.live_chain_id().await?);
        }

        if tx.gas.is_none() {
            let request = &tx;
            let gas_limit = self
                .retry
                .run("eth_estimateGas", || async move {
                    self.provider
                        .estimate_gas(request)
                        .await
                        .map_err(submission)
                })
                .await?;
            tx.set_gas_limit(gas_limit);
        }

        tx.build(&wallet.ethereum_wallet())
            .await
            .map_err(|e| DeployError::TransactionSubmission {
                context: label.to_string(),
                reason: RpcFailure::permanent(format!("failed to sign: {}", e)),
            })
    }

    async fn poll_receipt(&self, tx_hash: TxHash, label: &str) -> Result<TransactionReceipt> {
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => {
                    let failure = RpcFailure::from(e);
                    if failure.class() == ErrorClass::Permanent {
                        return Err(DeployError::TransactionSubmission {
                            context: label.to_string(),
                            reason: failure,
                        });
                    }
                    warn!(label, tx_hash = %tx_hash, error = %failure, "Receipt poll failed");
                }
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    /// Submit a contract creation and return the new address and tx hash
    pub async fn deploy(
        &self,
        wallet: &Wallet,
        kind: ContractKind,
        init_code: Bytes,
        gas_price: u128,
    ) -> Result<(Address, TxHash)> {
        let tx = TransactionRequest::default()
            .with_from(wallet.address())
            .with_deploy_code(init_code)
            .with_gas_price(gas_price);

        let receipt = self.send_transaction(wallet, tx, kind.label()).await?;
        let tx_hash = receipt.transaction_hash;
        let address = receipt
            .contract_address
            .ok_or_else(|| DeployError::HandleInvariant {
                contract: kind,
                tx_hash,
                detail: "receipt has no contract address".to_string(),
            })?;

        info!(
            contract = %kind,
            address = %address,
            tx_hash = %tx_hash,
            gas_price = %gas_price,
            network = %self.network.id(),
            "Deployed contract"
        );
        Ok((address, tx_hash))
    }

    /// Send native value and then fee tokens to `to`, waiting for each.
    ///
    /// Zero amounts are skipped.
    pub async fn fund(
        &self,
        wallet: &Wallet,
        to: Address,
        native_amount: U256,
        token_amount: U256,
    ) -> Result<FundingReceipt> {
        let token = if token_amount.is_zero() {
            None
        } else {
            Some(self.network.fee_token_address().ok_or_else(|| {
                DeployError::MissingFeeToken {
                    network: self.network.id().to_string(),
                }
            })?)
        };

        let mut funding = FundingReceipt::default();

        if !native_amount.is_zero() {
            let tx = TransactionRequest::default()
                .with_to(to)
                .with_value(native_amount);
            let receipt = self.send_transaction(wallet, tx, "native funding").await?;
            funding.native_tx = Some(receipt.transaction_hash);
        }

        if let Some(token) = token {
            let data = LinkToken::transferCall {
                to,
                value: token_amount,
            }
            .abi_encode();
            let tx = TransactionRequest::default().with_to(token).with_input(data);
            let receipt = self.send_transaction(wallet, tx, "token funding").await?;
            funding.token_tx = Some(receipt.transaction_hash);
        }

        info!(
            to = %to,
            native = %native_amount,
            token = %token_amount,
            "Funded address"
        );
        Ok(funding)
    }
}

/// Submit signed transaction bytes under `retry`.
///
/// Every attempt sends the same `raw` bytes. When a resubmission is rejected
/// because the node already has the transaction, the earlier attempt went
/// through and the submission counts as done.
pub(crate) async fn submit_signed<F, Fut>(
    retry: &RetryPolicy,
    label: &str,
    tx_hash: TxHash,
    raw: Bytes,
    mut send: F,
) -> Result<()>
where
    F: FnMut(Bytes) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut resubmission = false;
    retry
        .run(label, || {
            let retrying = resubmission;
            resubmission = true;
            let attempt = send(raw.clone());
            async move {
                match attempt.await {
                    Err(e) if retrying && e.is_already_submitted() => {
                        debug!(
                            label,
                            tx_hash = %tx_hash,
                            error = %e,
                            "Node already has transaction"
                        );
                        Ok(())
                    }
                    other => other,
                }
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn descriptor(url: &str, chain_id: u64) -> NetworkDescriptor {
        NetworkDescriptor::new(NetworkId::RskTestnet, url, U256::from(chain_id))
    }

    #[test]
    fn test_bad_url_is_connection_error() {
        let result = ChainClient::connect_lazy(
            descriptor("not a url", 31),
            RetryPolicy::none(),
            DEFAULT_TX_TIMEOUT,
        );
        assert!(matches!(result, Err(DeployError::Connection { .. })));
    }

    #[test]
    fn test_lazy_client_reports_configured_chain_id() {
        let client = ChainClient::connect_lazy(
            descriptor("http://localhost:4444", 31),
            RetryPolicy::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.chain_id(), U256::from(31));
        assert_eq!(client.family(), Some(ChainFamily::Evm));
        assert_eq!(client.tx_timeout(), Duration::from_secs(5));
        assert_eq!(client.retry_policy().attempts, 3);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connection_error() {
        let result = ChainClient::connect(
            descriptor("http://127.0.0.1:1", 31),
            RetryPolicy::none(),
            DEFAULT_TX_TIMEOUT,
        )
        .await;
        assert!(matches!(result, Err(DeployError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_node_gas_price_fetch_error() {
        let client = ChainClient::connect_lazy(
            descriptor("http://127.0.0.1:1", 31),
            RetryPolicy::none(),
            DEFAULT_TX_TIMEOUT,
        )
        .unwrap();
        let result = client.suggest_gas_price().await;
        assert!(matches!(result, Err(DeployError::GasPriceFetch(_))));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_retried() {
        let client = ChainClient::connect_lazy(
            descriptor("http://127.0.0.1:1", 31),
            RetryPolicy::new(3, Duration::from_millis(200)),
            DEFAULT_TX_TIMEOUT,
        )
        .unwrap();

        let started = std::time::Instant::now();
        let result = client.suggest_gas_price().await;
        let elapsed = started.elapsed();

        match result {
            Err(e @ DeployError::GasPriceFetch(_)) => assert!(e.is_retryable(), "{}", e),
            other => panic!("expected GasPriceFetch, got {:?}", other),
        }
        // Two delays between three attempts
        assert!(elapsed >= Duration::from_millis(400), "elapsed {:?}", elapsed);
    }

    fn failure(message: &str) -> DeployError {
        DeployError::TransactionSubmission {
            context: "Storage".to_string(),
            reason: RpcFailure::from_message(message),
        }
    }

    #[tokio::test]
    async fn test_resubmission_sends_identical_bytes() {
        let sent = Mutex::new(Vec::new());
        let raw = Bytes::from(vec![0x02, 0xf8, 0x6b, 0x01]);

        let result = submit_signed(
            &RetryPolicy::new(3, Duration::ZERO),
            "Storage",
            TxHash::with_last_byte(7),
            raw.clone(),
            |bytes| {
                let mut sent = sent.lock().unwrap();
                sent.push(bytes);
                let attempt = sent.len();
                async move {
                    if attempt < 3 {
                        Err(failure("connection reset by peer"))
                    } else {
                        Ok(())
                    }
                }
            },
        )
        .await;

        assert!(result.is_ok());
        let sent = sent.into_inner().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|bytes| *bytes == raw));
    }

    #[tokio::test]
    async fn test_resubmission_of_known_transaction_succeeds() {
        let attempts = AtomicU32::new(0);

        let result = submit_signed(
            &RetryPolicy::new(3, Duration::ZERO),
            "Storage",
            TxHash::with_last_byte(7),
            Bytes::from(vec![0x01]),
            |_| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err::<(), _>(failure("operation timed out"))
                    } else {
                        Err(failure("already known"))
                    }
                }
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_submission_nonce_too_low_fails() {
        let attempts = AtomicU32::new(0);

        let result = submit_signed(
            &RetryPolicy::new(3, Duration::ZERO),
            "Storage",
            TxHash::with_last_byte(7),
            Bytes::from(vec![0x01]),
            |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(failure("nonce too low")) }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(DeployError::TransactionSubmission { .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_funding_requires_fee_token() {
        let client = ChainClient::connect_lazy(
            descriptor("http://127.0.0.1:1", 31),
            RetryPolicy::none(),
            DEFAULT_TX_TIMEOUT,
        )
        .unwrap();
        let wallet = Wallet::from_private_key(KEY_0).unwrap();

        let result = client
            .fund(&wallet, Address::ZERO, U256::ZERO, U256::from(1))
            .await;
        assert!(matches!(result, Err(DeployError::MissingFeeToken { .. })));
    }

    #[tokio::test]
    async fn test_zero_funding_sends_nothing() {
        let client = ChainClient::connect_lazy(
            descriptor("http://127.0.0.1:1", 31),
            RetryPolicy::none(),
            DEFAULT_TX_TIMEOUT,
        )
        .unwrap();
        let wallet = Wallet::from_private_key(KEY_0).unwrap();

        let funding = client
            .fund(&wallet, Address::ZERO, U256::ZERO, U256::ZERO)
            .await
            .unwrap();
        assert_eq!(funding, FundingReceipt::default());
    }

    #[test]
    fn test_debug_omits_key_source() {
        let client = ChainClient::connect_lazy(
            descriptor("http://localhost:4444", 31),
            RetryPolicy::none(),
            DEFAULT_TX_TIMEOUT,
        )
        .unwrap();
        let out = format!("{:?}", client);
        assert!(out.contains("RskTestnet"));
        assert!(out.contains("localhost:4444"));
    }
}
