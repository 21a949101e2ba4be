//! Wallets used to sign deployments and contract calls
//!
//! A [`WalletSet`] is built once from decoded key material and is read-only
//! afterwards, except for moving the default pointer with
//! [`WalletSet::set_default`].

use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};
use std::fmt;

use crate::error::{DeployError, Result};

/// One signing identity
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Decode a hex private key, with or without `0x` prefix
    pub fn from_private_key(key: &str) -> Result<Self> {
        Self::decode(0, key)
    }

    /// Decode the key at position `index` of a key list
    fn decode(index: usize, key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = key.parse().map_err(|e| DeployError::KeyDecode {
            index,
            reason: format!("{}", e),
        })?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Network wallet used to sign transaction requests
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

/// Custom Debug that only shows the address.
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish()
    }
}

/// Ordered wallets for one network with a default pointer
#[derive(Debug, Clone, Default)]
pub struct WalletSet {
    default_index: usize,
    wallets: Vec<Wallet>,
}

impl WalletSet {
    /// Decode every key. Whitespace around each key is trimmed first.
    ///
    /// Fails on the first malformed key without producing a partial set.
    pub fn build<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wallets = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| Wallet::decode(index, key.as_ref().trim()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            default_index: 0,
            wallets,
        })
    }

    /// The wallet used for transactions when none is chosen explicitly
    pub fn default_wallet(&self) -> Result<&Wallet> {
        self.wallets
            .get(self.default_index)
            .ok_or(DeployError::EmptySet)
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    /// Wallet at `index`
    pub fn wallet(&self, index: usize) -> Result<&Wallet> {
        self.check_index(index)?;
        Ok(&self.wallets[index])
    }

    /// Move the default pointer. The only mutation after construction.
    pub fn set_default(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.default_index = index;
        Ok(())
    }

    pub fn all(&self) -> &[Wallet] {
        &self.wallets
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.wallets.len() {
            return Err(DeployError::IndexOutOfRange {
                index,
                len: self.wallets.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    // Anvil / Hardhat development accounts 0..2
    const KEYS: [&str; 3] = [
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    ];

    const ADDRESSES: [Address; 3] = [
        address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
        address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
        address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
    ];

    fn wallet_set() -> WalletSet {
        WalletSet::build(KEYS).unwrap()
    }

    #[test]
    fn test_build_decodes_in_order() {
        let set = wallet_set();
        assert_eq!(set.len(), 3);
        for (wallet, expected) in set.all().iter().zip(ADDRESSES) {
            assert_eq!(wallet.address(), expected);
        }
    }

    #[test]
    fn test_build_trims_whitespace() {
        let set =
            WalletSet::build([format!("  {}\n", KEYS[0]), format!("\t{} ", KEYS[1])]).unwrap();
        assert_eq!(set.wallet(0).unwrap().address(), ADDRESSES[0]);
        assert_eq!(set.wallet(1).unwrap().address(), ADDRESSES[1]);
    }

    #[test]
    fn test_default_is_first_wallet() {
        let set = wallet_set();
        assert_eq!(set.default_index(), 0);
        assert_eq!(set.default_wallet().unwrap().address(), ADDRESSES[0]);
    }

    #[test]
    fn test_build_fails_on_malformed_key() {
        let result = WalletSet::build([KEYS[0], "0xnot-a-key", KEYS[2]]);
        match result {
            Err(DeployError::KeyDecode { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected KeyDecode, got {:?}", other),
        }
    }

    #[test]
    fn test_single_key_decode_error() {
        assert_eq!(
            Wallet::from_private_key(KEYS[1]).unwrap().address(),
            ADDRESSES[1]
        );
        match Wallet::from_private_key("0xnot-a-key") {
            Err(e @ DeployError::KeyDecode { index: 0, .. }) => {
                assert!(!e.to_string().contains("not-a-key"));
            }
            other => panic!("expected KeyDecode, got {:?}", other),
        }
    }

    #[test]
    fn test_build_fails_on_short_key() {
        let result = WalletSet::build(["0xdeadbeef"]);
        assert!(matches!(result, Err(DeployError::KeyDecode { index: 0, .. })));
    }

    #[test]
    fn test_wallet_in_range() {
        let set = wallet_set();
        for (i, expected) in ADDRESSES.iter().enumerate() {
            assert_eq!(set.wallet(i).unwrap().address(), *expected);
        }
    }

    #[test]
    fn test_wallet_out_of_range() {
        let set = wallet_set();
        let len = set.len();
        for index in [len, len + 5, usize::MAX] {
            match set.wallet(index) {
                Err(DeployError::IndexOutOfRange { index: i, len: l }) => {
                    assert_eq!(i, index);
                    assert_eq!(l, len);
                }
                other => panic!("expected IndexOutOfRange, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_set_default_then_default() {
        let mut set = wallet_set();
        for (i, expected) in ADDRESSES.iter().enumerate() {
            set.set_default(i).unwrap();
            assert_eq!(set.default_wallet().unwrap().address(), *expected);
        }
    }

    #[test]
    fn test_set_default_invalid_leaves_default() {
        let mut set = wallet_set();
        set.set_default(2).unwrap();

        assert!(matches!(
            set.set_default(3),
            Err(DeployError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(set.set_default(8).is_err());
        assert_eq!(set.default_index(), 2);
        assert_eq!(set.default_wallet().unwrap().address(), ADDRESSES[2]);
    }

    #[test]
    fn test_empty_set() {
        let mut set = WalletSet::build(Vec::<String>::new()).unwrap();
        assert!(set.is_empty());
        assert!(matches!(set.default_wallet(), Err(DeployError::EmptySet)));
        assert!(matches!(
            set.wallet(0),
            Err(DeployError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(set.set_default(0).is_err());
    }

    #[test]
    fn test_wallet_debug_shows_address_only() {
        let set = wallet_set();
        let out = format!("{:?}", set.wallet(0).unwrap());
        assert!(out
            .to_lowercase()
            .contains("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
        assert!(!out.contains(&KEYS[0][2..]));
    }
}
