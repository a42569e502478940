//! Error types for the stake data model

use thiserror::Error;

/// Result type for stake-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Data model errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Address is not `0x` followed by 40 hex digits
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Transaction hash is not `0x` followed by 64 hex digits
    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),

    /// Token amount could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
