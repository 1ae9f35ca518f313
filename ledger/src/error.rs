//! # Error Taxonomy
//!
//! Every fallible ledger operation returns [`LedgerError`]. The first four
//! variants are the caller-facing taxonomy — precondition violations that
//! map cleanly onto HTTP status codes. The rest are infrastructure faults
//! that a presentation layer should surface as an internal error without
//! leaking detail.
//!
//! There is no retryable variant on purpose: every failure here is a
//! precondition violation or a storage fault, never a transient condition.

use thiserror::Error;

/// Errors produced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing or malformed input (empty name, empty address, zero amount).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrong teacher secret or wrong wallet PIN.
    #[error("authorization error: {0}")]
    Unauthorized(String),

    /// No wallet exists for the supplied address.
    #[error("not found: {0}")]
    NotFound(String),

    /// A transfer exceeds the sender's balance.
    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientFunds {
        /// The sender's current balance.
        balance: u64,
        /// The amount the transfer asked for.
        requested: u64,
    },

    /// A freshly derived address already maps to a wallet. With 2^32
    /// address values this is a lottery win; creation retries a few times
    /// before giving up with this error.
    #[error("address already in use: {address}")]
    AddressTaken {
        /// The colliding address.
        address: String,
    },

    /// Crediting a wallet would overflow its u64 balance.
    #[error("balance overflow for {address}")]
    BalanceOverflow {
        /// The wallet whose balance would overflow.
        address: String,
    },

    /// The underlying sled store failed.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Shorthand for a [`LedgerError::Validation`] with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    /// Shorthand for a [`LedgerError::NotFound`] naming the missing address.
    pub fn unknown_address(address: &str) -> Self {
        LedgerError::NotFound(format!("no wallet with address {address}"))
    }
}
