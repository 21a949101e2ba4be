//! Constructor options and configuration inputs for the oracle contracts

use alloy::primitives::{
    aliases::{I192, U192},
    Address, Bytes, I256, U256,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DeployError, Result};

/// Constructor parameters of the flux aggregator, minus the fee token address
/// which always comes from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxAggregatorOptions {
    /// Fee paid to oracles per submission, in token base units
    pub payment_amount: u128,
    /// Round timeout in seconds
    pub timeout: u32,
    pub validator: Address,
    pub min_submission_value: I256,
    pub max_submission_value: I256,
    pub decimals: u8,
    pub description: String,
}

impl Default for FluxAggregatorOptions {
    fn default() -> Self {
        Self {
            payment_amount: 1,
            timeout: 30,
            validator: Address::ZERO,
            min_submission_value: I256::from_raw(U256::from(3)),
            max_submission_value: I256::from_raw(U256::from(7)),
            decimals: 0,
            description: "Hardhat Flux Aggregator".to_string(),
        }
    }
}

/// Constructor parameters of the off-chain reporting aggregator, minus the fee
/// token address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainAggregatorOptions {
    pub maximum_gas_price: u32,
    pub reasonable_gas_price: u32,
    pub micro_link_per_eth: u32,
    pub link_gwei_per_observation: u32,
    pub link_gwei_per_transmission: u32,
    pub minimum_answer: I192,
    pub maximum_answer: I192,
    pub billing_access_controller: Address,
    pub requester_access_controller: Address,
    pub decimals: u8,
    pub description: String,
}

impl Default for OffchainAggregatorOptions {
    fn default() -> Self {
        Self {
            maximum_gas_price: 500_000_000,
            reasonable_gas_price: 28_000,
            micro_link_per_eth: 500,
            link_gwei_per_observation: 500,
            link_gwei_per_transmission: 500,
            minimum_answer: I192::from_raw(U192::from(1)),
            maximum_answer: I192::from_raw(U192::from(5000)),
            billing_access_controller: Address::ZERO,
            requester_access_controller: Address::ZERO,
            decimals: 8,
            description: "Test OCR".to_string(),
        }
    }
}

// ============================================================================
// OCR Configuration
// ============================================================================

/// On-chain identity of one oracle node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleIdentity {
    /// Key that signs reports
    pub signer: Address,
    /// Account that transmits reports on chain
    pub transmitter: Address,
    /// Account receiving the transmitter's fees
    pub payee: Address,
}

/// Protocol parameters of an OCR deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainAggregatorConfig {
    /// Deviation threshold in parts per billion
    pub alpha_ppb: u64,
    pub delta_c: Duration,
    pub delta_grace: Duration,
    pub delta_progress: Duration,
    pub delta_stage: Duration,
    pub delta_resend: Duration,
    pub delta_round: Duration,
    pub r_max: u8,
    /// Transmission schedule
    pub s: Vec<u32>,
    /// Number of oracles
    pub n: usize,
    /// Tolerated faulty oracles
    pub f: u8,
}

impl Default for OffchainAggregatorConfig {
    fn default() -> Self {
        Self {
            alpha_ppb: 1,
            delta_c: Duration::from_secs(10 * 60),
            delta_grace: Duration::from_secs(1),
            delta_progress: Duration::from_secs(30),
            delta_stage: Duration::from_secs(10),
            delta_resend: Duration::from_secs(10),
            delta_round: Duration::from_secs(20),
            r_max: 4,
            s: vec![1, 1, 1, 1, 1],
            n: 5,
            f: 1,
        }
    }
}

/// Version tag of the off-chain config encoding expected by the contract
pub const OFFCHAIN_CONFIG_VERSION: u64 = 1;

/// Arguments of `OffchainAggregator.setConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfigInput {
    pub signers: Vec<Address>,
    pub transmitters: Vec<Address>,
    pub threshold: u8,
    pub encoded_config_version: u64,
    pub encoded: Bytes,
}

impl OffchainAggregatorConfig {
    /// Check the protocol's fault bound and schedule shape against `oracles`
    pub fn validate(&self, oracles: &[OracleIdentity]) -> Result<()> {
        if oracles.len() != self.n {
            return Err(DeployError::Config(format!(
                "config expects {} oracles, got {}",
                self.n,
                oracles.len()
            )));
        }
        if self.n <= 3 * self.f as usize {
            return Err(DeployError::Config(format!(
                "{} oracles cannot tolerate {} faulty ones (need n > 3f)",
                self.n, self.f
            )));
        }
        if self.s.is_empty() || self.s.iter().any(|s| *s as usize > self.n) {
            return Err(DeployError::Config(
                "transmission schedule must be non-empty with entries <= n".to_string(),
            ));
        }
        if self.delta_progress <= self.delta_round {
            return Err(DeployError::Config(
                "delta_progress must exceed delta_round".to_string(),
            ));
        }
        Ok(())
    }

    /// Build `setConfig` arguments. `encoded` is the node-generated off-chain
    /// config blob; only the on-chain half is assembled here.
    pub fn config_input(
        &self,
        oracles: &[OracleIdentity],
        encoded: impl Into<Bytes>,
    ) -> Result<OcrConfigInput> {
        self.validate(oracles)?;
        Ok(OcrConfigInput {
            signers: oracles.iter().map(|o| o.signer).collect(),
            transmitters: oracles.iter().map(|o| o.transmitter).collect(),
            threshold: self.f,
            encoded_config_version: OFFCHAIN_CONFIG_VERSION,
            encoded: encoded.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracles(n: u8) -> Vec<OracleIdentity> {
        (1..=n)
            .map(|i| OracleIdentity {
                signer: Address::with_last_byte(i),
                transmitter: Address::with_last_byte(0x80 + i),
                payee: Address::with_last_byte(0x40 + i),
            })
            .collect()
    }

    #[test]
    fn test_flux_defaults() {
        let options = FluxAggregatorOptions::default();
        assert_eq!(options.payment_amount, 1);
        assert_eq!(options.timeout, 30);
        assert_eq!(options.min_submission_value, I256::try_from(3i64).unwrap());
        assert_eq!(options.max_submission_value, I256::try_from(7i64).unwrap());
        assert_eq!(options.decimals, 0);
        assert_eq!(options.description, "Hardhat Flux Aggregator");
    }

    #[test]
    fn test_ocr_defaults() {
        let options = OffchainAggregatorOptions::default();
        assert_eq!(options.maximum_gas_price, 500_000_000);
        assert_eq!(options.reasonable_gas_price, 28_000);
        assert_eq!(options.micro_link_per_eth, 500);
        assert_eq!(options.link_gwei_per_observation, 500);
        assert_eq!(options.link_gwei_per_transmission, 500);
        assert_eq!(options.minimum_answer, I192::try_from(1i64).unwrap());
        assert_eq!(options.maximum_answer, I192::try_from(5000i64).unwrap());
        assert_eq!(options.decimals, 8);
        assert_eq!(options.description, "Test OCR");
    }

    #[test]
    fn test_config_defaults() {
        let config = OffchainAggregatorConfig::default();
        assert_eq!(config.delta_c, Duration::from_secs(600));
        assert_eq!(config.s, vec![1; 5]);
        assert_eq!((config.n, config.f, config.r_max), (5, 1, 4));
    }

    #[test]
    fn test_config_input_from_oracles() {
        let oracles = oracles(5);
        let input = OffchainAggregatorConfig::default()
            .config_input(&oracles, vec![0xde, 0xad])
            .unwrap();

        assert_eq!(input.signers.len(), 5);
        assert_eq!(input.signers[0], Address::with_last_byte(1));
        assert_eq!(input.transmitters[4], Address::with_last_byte(0x85));
        assert_eq!(input.threshold, 1);
        assert_eq!(input.encoded_config_version, OFFCHAIN_CONFIG_VERSION);
        assert_eq!(input.encoded.to_vec(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_oracle_identity_json() {
        let json = r#"{
            "signer": "0x0000000000000000000000000000000000000001",
            "transmitter": "0x0000000000000000000000000000000000000081",
            "payee": "0x0000000000000000000000000000000000000041"
        }"#;
        let oracle: OracleIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(oracle, oracles(1)[0]);
    }

    #[test]
    fn test_config_rejects_wrong_oracle_count() {
        let result = OffchainAggregatorConfig::default().config_input(&oracles(4), Bytes::new());
        assert!(matches!(result, Err(DeployError::Config(_))));
    }

    #[test]
    fn test_config_rejects_fault_bound() {
        let config = OffchainAggregatorConfig {
            n: 3,
            s: vec![1, 1, 1],
            ..Default::default()
        };
        assert!(config.validate(&oracles(3)).is_err());
    }

    #[test]
    fn test_config_rejects_bad_timing() {
        let config = OffchainAggregatorConfig {
            delta_round: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(config.validate(&oracles(5)).is_err());
    }
}
