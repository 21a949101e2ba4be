//! Retry policy for chain I/O
//!
//! A single [`RetryPolicy`] (fixed attempt count, fixed linear delay) is owned
//! by each [`crate::ChainClient`] and applied to every RPC call it makes. Only
//! errors that classify as [`ErrorClass::Transient`] are retried.
//!
//! Transport failures are classified from the error itself (alloy's
//! [`TransportErrorKind`], the reqwest error behind it and any I/O error in its
//! source chain). Only JSON-RPC error responses and otherwise opaque errors
//! fall back to message matching.

use alloy::transports::{RpcError, TransportErrorKind};
use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// Fixed-attempt, linear-delay retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub attempts: u32,
    /// Delay between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Policy that performs exactly one attempt
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Delay before the retry following `attempt` (0-indexed). Linear: the
    /// same for every attempt.
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max = attempts,
                        ?delay,
                        error = %e,
                        "Transient chain error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(operation, attempt = attempt + 1, error = %e, "Giving up");
                    return Err(e);
                }
            }
        }
    }
}

/// Classifies RPC error messages for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection resets, timeouts, rate limiting
    Transient,
    /// Rejections the chain will repeat (reverts, funds, nonces, bad input)
    Permanent,
    /// Unrecognized; surfaced to the caller without a retry
    Unknown,
}

/// Classify an error message
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("reverted")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("nonce too low")
        || error_lower.contains("nonce too high")
        || error_lower.contains("already known")
        || error_lower.contains("underpriced")
        || error_lower.contains("out of gas")
        || error_lower.contains("invalid")
        || error_lower.contains("relative url")
    {
        return ErrorClass::Permanent;
    }

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("error sending request")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
    {
        return ErrorClass::Transient;
    }

    ErrorClass::Unknown
}

/// Classify a failed RPC from the structure of the transport error
pub fn classify_rpc_error(error: &RpcError<TransportErrorKind>) -> ErrorClass {
    match error {
        RpcError::Transport(kind) => classify_transport(kind),
        RpcError::ErrorResp(payload) => classify_error(&payload.message),
        RpcError::NullResp => ErrorClass::Transient,
        RpcError::UnsupportedFeature(_) | RpcError::LocalUsageError(_) => ErrorClass::Permanent,
        other => classify_error(&error_chain(other)),
    }
}

fn classify_transport(kind: &TransportErrorKind) -> ErrorClass {
    if kind.is_retry_err() {
        return ErrorClass::Transient;
    }
    match kind {
        TransportErrorKind::BackendGone | TransportErrorKind::PubsubUnavailable => {
            ErrorClass::Transient
        }
        TransportErrorKind::Custom(inner) => classify_source_chain(inner.as_ref()),
        other => classify_error(&other.to_string()),
    }
}

/// Walk `error` and its sources looking for a connection-level cause
fn classify_source_chain(error: &(dyn StdError + Send + Sync + 'static)) -> ErrorClass {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(http) = err.downcast_ref::<reqwest::Error>() {
            if http.is_connect() || http.is_timeout() {
                return ErrorClass::Transient;
            }
            if let Some(status) = http.status() {
                if status.is_server_error() || status.as_u16() == 429 {
                    return ErrorClass::Transient;
                }
            }
        }
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if is_transient_io(io_err.kind()) {
                return ErrorClass::Transient;
            }
        }
        current = err.source();
    }
    classify_error(&error_chain(error))
}

fn is_transient_io(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Interrupted
    )
}

/// `error` followed by each distinct source message, joined with `: `
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(err) = current {
        let message = err.to_string();
        if !rendered.contains(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        current = err.source();
    }
    rendered
}
