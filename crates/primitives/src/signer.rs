use auto_impl::auto_impl;
use std::error::Error as StdError;

/// Produces raw signatures over arbitrary messages.
///
/// Implementors hash the message with their configured algorithm before signing. The returned
/// bytes are in the ledger's wire format, which for ECDSA keys is the 64 byte `r || s` encoding.
#[auto_impl(&, &mut, Box, Arc)]
pub trait Signer {
    /// Signs `message`.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}

/// Error returned by a [`Signer`].
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The signing backend rejected the request.
    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync + 'static>),
}

impl SignerError {
    /// Wraps any error as [`SignerError::Other`].
    pub fn other(error: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Other(error.into())
    }
}
