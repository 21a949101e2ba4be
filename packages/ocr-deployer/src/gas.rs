//! Per-chain gas price adjustment
//!
//! Chains with slow or uneven block inclusion get a flat markup on top of the
//! node's suggested gas price. This is a chain-identity policy for a test
//! deployment tool, not a fee-market model.

use alloy::primitives::U256;
use tracing::debug;

use crate::client::ChainClient;
use crate::error::{DeployError, Result, RpcFailure};

/// RSK mainnet (30), testnet (31) and regtest (33)
pub const SLOW_FINALITY_CHAIN_IDS: [u64; 3] = [30, 31, 33];

/// Markup applied on slow-finality chains, in percent
pub const SLOW_FINALITY_MARKUP_PERCENT: u64 = 2;

/// Which chains get a markup, and how much
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPricePolicy {
    slow_finality_chain_ids: Vec<U256>,
    markup_percent: U256,
}

impl Default for GasPricePolicy {
    fn default() -> Self {
        Self {
            slow_finality_chain_ids: SLOW_FINALITY_CHAIN_IDS
                .iter()
                .map(|id| U256::from(*id))
                .collect(),
            markup_percent: U256::from(SLOW_FINALITY_MARKUP_PERCENT),
        }
    }
}

impl GasPricePolicy {
    pub fn new(slow_finality_chain_ids: Vec<U256>, markup_percent: u64) -> Self {
        Self {
            slow_finality_chain_ids,
            markup_percent: U256::from(markup_percent),
        }
    }

    /// Membership test by numeric value
    pub fn is_slow_finality(&self, chain_id: U256) -> bool {
        self.slow_finality_chain_ids.iter().any(|id| *id == chain_id)
    }

    /// `suggested + floor(suggested * markup / 100)` on slow-finality chains,
    /// `suggested` everywhere else. Exact integer arithmetic.
    pub fn adjust(&self, chain_id: U256, suggested: U256) -> U256 {
        if !self.is_slow_finality(chain_id) {
            return suggested;
        }
        let markup = suggested.saturating_mul(self.markup_percent) / U256::from(100);
        suggested.saturating_add(markup)
    }
}

/// Suggested gas price for `client`'s chain, with the default policy applied
pub async fn adjust_gas_price(client: &ChainClient) -> Result<u128> {
    let suggested = client.suggest_gas_price().await?;
    let chain_id = client.chain_id();
    let adjusted = client.gas_policy().adjust(chain_id, U256::from(suggested));
    let adjusted = narrow_gas_price(chain_id, adjusted)?;

    debug!(
        chain_id = %chain_id,
        suggested = %suggested,
        adjusted = %adjusted,
        "Adjusted gas price"
    );
    Ok(adjusted)
}

/// Legacy transactions carry the gas price as `u128`
fn narrow_gas_price(chain_id: U256, price: U256) -> Result<u128> {
    u128::try_from(price).map_err(|_| {
        DeployError::GasPriceFetch(RpcFailure::permanent(format!(
            "adjusted gas price {} on chain {} does not fit in u128",
            price, chain_id
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjust(chain_id: u64, suggested: u128) -> U256 {
        GasPricePolicy::default().adjust(U256::from(chain_id), U256::from(suggested))
    }

    #[test]
    fn test_markup_on_slow_finality_chains() {
        for chain_id in SLOW_FINALITY_CHAIN_IDS {
            assert_eq!(adjust(chain_id, 100), U256::from(102));
            // floor(101 * 2 / 100) = 2
            assert_eq!(adjust(chain_id, 101), U256::from(103));
            // floor(999999999999 * 2 / 100) = 19999999999
            assert_eq!(
                adjust(chain_id, 999_999_999_999),
                U256::from(1_019_999_999_998u64)
            );
        }
    }

    #[test]
    fn test_one_gwei_on_rsk_testnet() {
        assert_eq!(adjust(31, 1_000_000_000), U256::from(1_020_000_000u64));
    }

    #[test]
    fn test_other_chains_unchanged() {
        for chain_id in [1u64, 5, 42, 1337, 31337, 32, 34] {
            for suggested in [0u128, 100, 101, 999_999_999_999] {
                assert_eq!(adjust(chain_id, suggested), U256::from(suggested));
            }
        }
    }

    #[test]
    fn test_membership_by_value() {
        let policy = GasPricePolicy::default();
        // Freshly constructed values, never the ones stored in the policy
        let chain_id = U256::from_str_radix("1f", 16).unwrap();
        assert!(policy.is_slow_finality(chain_id));
        assert!(!policy.is_slow_finality(U256::from(30) << 64));
    }

    #[test]
    fn test_large_prices_exact() {
        let suggested = U256::from(u128::MAX);
        let adjusted = GasPricePolicy::default().adjust(U256::from(33), suggested);
        assert_eq!(adjusted, suggested + suggested * U256::from(2) / U256::from(100));
        assert!(adjusted > U256::from(u128::MAX));
    }

    #[test]
    fn test_oversized_price_is_error() {
        let chain_id = U256::from(33);
        let adjusted = GasPricePolicy::default().adjust(chain_id, U256::from(u128::MAX));
        let result = narrow_gas_price(chain_id, adjusted);
        match result {
            Err(e @ DeployError::GasPriceFetch(_)) => assert!(!e.is_retryable()),
            other => panic!("expected GasPriceFetch, got {:?}", other),
        }

        let fits = GasPricePolicy::default().adjust(chain_id, U256::from(1_000_000_000u64));
        assert_eq!(narrow_gas_price(chain_id, fits).unwrap(), 1_020_000_000);
    }

    #[test]
    fn test_custom_policy() {
        let policy = GasPricePolicy::new(vec![U256::from(137)], 10);
        assert_eq!(policy.adjust(U256::from(137), U256::from(1000)), U256::from(1100));
        assert_eq!(policy.adjust(U256::from(31), U256::from(1000)), U256::from(1000));
    }
}
