//! Redaction wrapper for key material
//!
//! Private keys travel from configuration into [`crate::WalletSet::build`]
//! wrapped in [`Redacted`] so that `Debug` on a network descriptor, or a stray
//! `tracing` field, can never print them.

use std::fmt::{self, Debug, Display};

/// Wrapper that prints `<redacted>` instead of its inner value
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Access the secret. Callers must not log the result.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> From<T> for Redacted<T> {
    fn from(value: T) -> Self {
        Redacted(value)
    }
}
