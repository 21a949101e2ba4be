//! Network descriptors
//!
//! Static facts about a target chain: identifier, RPC URL, configured chain ID,
//! the fee token address, and where private keys come from.
//!
//! # Environment Variable Schema
//!
//! ```text
//! RSK_REGTEST_RPC_URL=http://localhost:4444
//! RSK_REGTEST_CHAIN_ID=33
//! RSK_REGTEST_LINK_TOKEN_ADDRESS=0x...       # optional
//! RSK_REGTEST_PRIVATE_KEYS=0xabc...,0xdef... # or RSK_REGTEST_PRIVATE_KEYS_FILE
//! RSK_REGTEST_CHAIN_FAMILY=evm               # optional, required for custom ids
//! ```
//!
//! The prefix is the upper-cased network identifier.

use alloy::primitives::{Address, U256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::error::{DeployError, Result};
use crate::redact::Redacted;
use crate::wallet::WalletSet;

// ============================================================================
// Identifiers
// ============================================================================

/// Group of chains sharing one client and ABI compatibility profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    /// Ethereum and every EVM-compatible chain (RSK included)
    Evm,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
        }
    }
}

impl FromStr for ChainFamily {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "evm" | "ethereum" => Ok(ChainFamily::Evm),
            other => Err(DeployError::Config(format!("unknown chain family: {}", other))),
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readable network identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetworkId {
    EthereumHardhat,
    EthereumKovan,
    EthereumGoerli,
    RskRegtest,
    RskTestnet,
    /// Any other network; its family must be configured explicitly
    Custom(String),
}

impl NetworkId {
    pub fn as_str(&self) -> &str {
        match self {
            NetworkId::EthereumHardhat => "ethereum_hardhat",
            NetworkId::EthereumKovan => "ethereum_kovan",
            NetworkId::EthereumGoerli => "ethereum_goerli",
            NetworkId::RskRegtest => "rsk_regtest",
            NetworkId::RskTestnet => "rsk_testnet",
            NetworkId::Custom(name) => name,
        }
    }

    /// Chain family of the well-known networks; `None` for custom ids
    pub fn family(&self) -> Option<ChainFamily> {
        match self {
            NetworkId::EthereumHardhat
            | NetworkId::EthereumKovan
            | NetworkId::EthereumGoerli
            | NetworkId::RskRegtest
            | NetworkId::RskTestnet => Some(ChainFamily::Evm),
            NetworkId::Custom(_) => None,
        }
    }

    /// Prefix used for this network's environment variables
    pub fn env_prefix(&self) -> String {
        self.as_str().to_uppercase().replace(['-', '.'], "_")
    }
}

impl FromStr for NetworkId {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DeployError::Config("network id is empty".to_string()));
        }
        Ok(match s.to_lowercase().as_str() {
            "ethereum_hardhat" => NetworkId::EthereumHardhat,
            "ethereum_kovan" => NetworkId::EthereumKovan,
            "ethereum_goerli" => NetworkId::EthereumGoerli,
            "rsk_regtest" => NetworkId::RskRegtest,
            "rsk_testnet" => NetworkId::RskTestnet,
            _ => NetworkId::Custom(s.to_string()),
        })
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Key Material
// ============================================================================

/// Where a network's private keys come from
#[derive(Debug, Clone, Default)]
pub enum KeySource {
    /// No keys; the wallet set will be empty
    #[default]
    None,
    /// Keys held in memory
    Inline(Vec<Redacted<String>>),
    /// Comma-separated keys in an environment variable, read at fetch time
    Env(String),
    /// One key per line in a file, read at fetch time
    File(PathBuf),
}

impl KeySource {
    /// Fetch raw key strings. Entries are not trimmed or decoded here.
    pub fn fetch(&self) -> Result<Vec<Redacted<String>>> {
        match self {
            KeySource::None => Ok(Vec::new()),
            KeySource::Inline(keys) => Ok(keys.clone()),
            KeySource::Env(var) => {
                let raw = std::env::var(var)
                    .map_err(|_| DeployError::KeySource(format!("{} is not set", var)))?;
                Ok(split_keys(&raw, ','))
            }
            KeySource::File(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    DeployError::KeySource(format!("cannot read {}: {}", path.display(), e))
                })?;
                Ok(split_keys(&raw, '\n'))
            }
        }
    }
}

fn split_keys(raw: &str, separator: char) -> Vec<Redacted<String>> {
    raw.split(separator)
        .filter(|s| !s.trim().is_empty())
        .map(|s| Redacted(s.to_string()))
        .collect()
}

// ============================================================================
// Network Descriptor
// ============================================================================

/// Static description of one target chain
#[derive(Debug)]
pub struct NetworkDescriptor {
    id: NetworkId,
    rpc_url: String,
    chain_id: U256,
    family: Option<ChainFamily>,
    key_source: KeySource,
    fee_token: RwLock<Option<Address>>,
}

impl Clone for NetworkDescriptor {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            family: self.family,
            key_source: self.key_source.clone(),
            fee_token: RwLock::new(self.fee_token_address()),
        }
    }
}

impl NetworkDescriptor {
    /// Create a descriptor. The chain family defaults to the id's family.
    pub fn new(id: NetworkId, rpc_url: impl Into<String>, chain_id: U256) -> Self {
        Self {
            family: id.family(),
            id,
            rpc_url: rpc_url.into(),
            chain_id,
            key_source: KeySource::None,
            fee_token: RwLock::new(None),
        }
    }

    pub fn with_family(mut self, family: ChainFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn with_key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    pub fn with_fee_token(self, address: Address) -> Self {
        *self.fee_token.write().unwrap_or_else(PoisonError::into_inner) = Some(address);
        self
    }

    /// Load a descriptor from `<PREFIX>_*` environment variables
    pub fn from_env(id: NetworkId) -> Result<Self> {
        let prefix = id.env_prefix();
        let var = |name: &str| std::env::var(format!("{}_{}", prefix, name)).ok();

        let rpc_url = var("RPC_URL")
            .ok_or_else(|| DeployError::Config(format!("{}_RPC_URL is required", prefix)))?;
        validate_rpc_url(&rpc_url, &format!("{}_RPC_URL", prefix))?;

        let chain_id = var("CHAIN_ID")
            .ok_or_else(|| DeployError::Config(format!("{}_CHAIN_ID is required", prefix)))?;
        let chain_id = U256::from_str(chain_id.trim()).map_err(|e| {
            DeployError::Config(format!("{}_CHAIN_ID is not an integer: {}", prefix, e))
        })?;

        let mut descriptor = Self::new(id, rpc_url, chain_id);

        if let Some(family) = var("CHAIN_FAMILY") {
            descriptor = descriptor.with_family(family.parse()?);
        }

        if let Some(token) = var("LINK_TOKEN_ADDRESS").filter(|s| !s.trim().is_empty()) {
            let address = Address::from_str(token.trim()).map_err(|e| {
                DeployError::Config(format!("{}_LINK_TOKEN_ADDRESS is invalid: {}", prefix, e))
            })?;
            descriptor = descriptor.with_fee_token(address);
        }

        descriptor.key_source = if let Some(path) = var("PRIVATE_KEYS_FILE") {
            KeySource::File(PathBuf::from(path))
        } else {
            KeySource::Env(format!("{}_PRIVATE_KEYS", prefix))
        };

        Ok(descriptor)
    }

    pub fn id(&self) -> &NetworkId {
        &self.id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Configured chain ID. Never fetched from the chain.
    pub fn chain_id(&self) -> U256 {
        self.chain_id
    }

    pub fn family(&self) -> Option<ChainFamily> {
        self.family
    }

    pub fn key_source(&self) -> &KeySource {
        &self.key_source
    }

    /// Address of the network's fee token, if known
    pub fn fee_token_address(&self) -> Option<Address> {
        *self.fee_token.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the address of a freshly deployed fee token.
    ///
    /// This is the only mutation a descriptor allows after construction.
    pub fn record_fee_token_address(&self, address: Address) {
        let previous = self
            .fee_token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(address);
        info!(
            network = %self.id,
            address = %address,
            previous = ?previous,
            "Recorded fee token address"
        );
    }

    /// Decode this network's key material into a wallet set
    pub fn wallets(&self) -> Result<WalletSet> {
        let keys = self.key_source.fetch()?;
        WalletSet::build(keys.iter().map(|k| k.expose().as_str()))
    }
}

/// Validates that a URL uses http/https and has a host component.
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str)
        .map_err(|e| DeployError::Config(format!("{} must be a valid URL: {}", name, e)))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(DeployError::Config(format!(
            "{} must use http:// or https:// scheme, got {}",
            name, scheme
        )));
    }

    if parsed.host_str().is_none() {
        return Err(DeployError::Config(format!(
            "{} must have a host component",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn hardhat() -> NetworkDescriptor {
        NetworkDescriptor::new(
            NetworkId::EthereumHardhat,
            "http://localhost:8545",
            U256::from(31337),
        )
    }

    #[test]
    fn test_network_id_round_trip_known() {
        let id: NetworkId = "rsk_regtest".parse().unwrap();
        assert_eq!(id, NetworkId::RskRegtest);
        assert_eq!(id.as_str(), "rsk_regtest");
        assert_eq!(id.family(), Some(ChainFamily::Evm));
    }

    #[test]
    fn test_custom_network_has_no_family() {
        let id: NetworkId = "solana_devnet".parse().unwrap();
        assert_eq!(id, NetworkId::Custom("solana_devnet".to_string()));
        assert_eq!(id.family(), None);
        assert_eq!(id.env_prefix(), "SOLANA_DEVNET");
    }

    #[test]
    fn test_chain_family_parse() {
        assert_eq!("EVM".parse::<ChainFamily>().unwrap(), ChainFamily::Evm);
        assert!("cosmos".parse::<ChainFamily>().is_err());
    }

    #[test]
    fn test_chain_id_is_configured_value() {
        let network =
            NetworkDescriptor::new(NetworkId::RskRegtest, "http://localhost:4444", U256::from(33));
        assert_eq!(network.chain_id(), U256::from(33));
    }

    #[test]
    fn test_fee_token_backfill() {
        let network = hardhat();
        assert_eq!(network.fee_token_address(), None);

        let token = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
        network.record_fee_token_address(token);
        assert_eq!(network.fee_token_address(), Some(token));

        let copy = network.clone();
        assert_eq!(copy.fee_token_address(), Some(token));
    }

    #[test]
    fn test_wallets_from_inline_keys() {
        let network = hardhat().with_key_source(KeySource::Inline(vec![
            Redacted(format!("  {}\n", KEY_0)),
            Redacted(KEY_1.to_string()),
        ]));

        let wallets = network.wallets().unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(
            wallets.default_wallet().unwrap().address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let network =
            hardhat().with_key_source(KeySource::Inline(vec![Redacted(KEY_0.to_string())]));
        let out = format!("{:?}", network);
        assert!(!out.contains(&KEY_0[2..]));
    }

    #[test]
    fn test_split_keys_skips_blank_lines() {
        let keys = split_keys(&format!("{}\n\n{}\n", KEY_0, KEY_1), '\n');
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_validate_rpc_url() {
        assert!(validate_rpc_url("http://localhost:8545", "RPC").is_ok());
        assert!(validate_rpc_url("https://public-node.testnet.rsk.co", "RPC").is_ok());
        assert!(validate_rpc_url("ws://localhost:8546", "RPC").is_err());
        assert!(validate_rpc_url("not a url", "RPC").is_err());
    }
}
