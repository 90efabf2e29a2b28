//! Wallet errors.

use alloy_primitives::hex::FromHexError;
use k256::ecdsa;

/// Errors returned when turning user input into a private key.
#[derive(Debug, thiserror::Error)]
pub enum PrivateKeyError {
    /// The key is not valid hex.
    #[error("Failed to create signer from private key. Private key is invalid hex: {0}")]
    InvalidHex(#[from] FromHexError),
    /// The key decoded but is not a valid scalar for its curve.
    #[error("Failed to create signer from private key: {0}")]
    InvalidKey(#[source] ecdsa::Error),
    /// The input is the name of an environment variable rather than a key.
    #[error(
        "Failed to create signer from private key. Invalid private key. \
         But env var {0} exists. Is the `$` anchor missing?"
    )]
    ExistsAsEnvVar(String),
}

/// Errors returned by the signers in this crate.
#[derive(Debug, thiserror::Error)]
pub enum WalletSignerError {
    /// Invalid hex input.
    #[error(transparent)]
    InvalidHex(#[from] FromHexError),
    /// The curve operation failed.
    #[error(transparent)]
    Ecdsa(#[from] ecdsa::Error),
    /// A public key did not have the expected length.
    #[error("invalid public key length: expected 64 bytes, got {0}")]
    InvalidPublicKeyLength(usize),
    /// Unknown hash algorithm code.
    #[error("unsupported hash algorithm code {0}")]
    UnsupportedHashAlgorithm(u32),
}
