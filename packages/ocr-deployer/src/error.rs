//! Errors for deployment and chain access
//!
//! Every fallible operation in this crate returns [`DeployError`]. Errors that
//! originate from chain I/O carry an [`RpcFailure`]: the rendered error chain
//! plus the retry classification taken from the transport error itself.

use alloy::primitives::{Address, TxHash};
use alloy::transports::{RpcError, TransportErrorKind};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::artifacts::ContractKind;
use crate::retry::{classify_error, classify_rpc_error, error_chain, ErrorClass};

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    /// RPC dial or handshake failed
    #[error("failed to connect to {url}: {reason}")]
    Connection { url: String, reason: RpcFailure },

    /// A private key could not be decoded. The key text itself is never included.
    #[error("failed to decode private key #{index}: {reason}")]
    KeyDecode { index: usize, reason: String },

    /// The configured key material could not be fetched
    #[error("failed to load key material: {0}")]
    KeySource(String),

    #[error("wallet index {index} out of range ({len} wallets)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("wallet set is empty")]
    EmptySet,

    /// No deployer implementation exists for the client's chain family
    #[error("unsupported blockchain client for network {network}")]
    UnsupportedClient { network: String },

    #[error("failed to fetch suggested gas price: {0}")]
    GasPriceFetch(RpcFailure),

    /// The chain rejected or reverted a transaction, or its receipt never arrived
    #[error("{context} transaction failed: {reason}")]
    TransactionSubmission { context: String, reason: RpcFailure },

    /// A read-only contract call failed
    #[error("call {contract}.{method} at {address} failed: {reason}")]
    ContractCall {
        contract: &'static str,
        method: &'static str,
        address: Address,
        reason: RpcFailure,
    },

    /// A token-linked contract was requested but the network has no fee token yet
    #[error("network {network} has no fee token address; deploy or configure one first")]
    MissingFeeToken { network: String },

    #[error("invalid contract artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("no bytecode loaded for {0}")]
    MissingArtifact(ContractKind),

    /// A deployment succeeded on chain but its result cannot be turned into a
    /// handle. This is a programmer or configuration bug, never retried.
    #[error("{contract} deployment in tx {tx_hash} broke a handle invariant: {detail}")]
    HandleInvariant {
        contract: ContractKind,
        tx_hash: TxHash,
        detail: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DeployError {
    /// Whether the retry policy may run the failed operation again.
    ///
    /// Only errors coming from chain I/O are candidates, and only when they
    /// classify as transient.
    pub fn is_retryable(&self) -> bool {
        match self.rpc_failure() {
            Some(failure) => failure.class() == ErrorClass::Transient,
            None => false,
        }
    }

    /// Whether a resubmission was rejected because the node already has the
    /// transaction (or a mined transaction already consumed its nonce)
    pub fn is_already_submitted(&self) -> bool {
        let DeployError::TransactionSubmission { reason, .. } = self else {
            return false;
        };
        let message = reason.message().to_lowercase();
        message.contains("already known")
            || message.contains("known transaction")
            || message.contains("already exists")
            || message.contains("already imported")
            || message.contains("nonce too low")
    }

    fn rpc_failure(&self) -> Option<&RpcFailure> {
        match self {
            DeployError::Connection { reason, .. }
            | DeployError::TransactionSubmission { reason, .. }
            | DeployError::ContractCall { reason, .. } => Some(reason),
            DeployError::GasPriceFetch(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A failed chain request: its rendered error chain and retry class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFailure {
    message: String,
    class: ErrorClass,
}

impl RpcFailure {
    /// Classify by message text only
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let class = classify_error(&message);
        Self { message, class }
    }

    /// A failure that must never be retried
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            class: ErrorClass::Permanent,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&RpcError<TransportErrorKind>> for RpcFailure {
    fn from(error: &RpcError<TransportErrorKind>) -> Self {
        Self {
            message: error_chain(error),
            class: classify_rpc_error(error),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for RpcFailure {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        Self::from(&error)
    }
}

impl From<alloy::contract::Error> for RpcFailure {
    fn from(error: alloy::contract::Error) -> Self {
        match error {
            alloy::contract::Error::TransportError(e) => Self::from(&e),
            // ABI and decoding failures repeat on every attempt
            other => Self::permanent(error_chain(&other)),
        }
    }
}
