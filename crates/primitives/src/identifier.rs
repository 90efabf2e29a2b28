use alloy_primitives::B256;
use sha3::{Digest, Sha3_256};

/// A 32 byte identifier for blocks and transactions.
pub type Identifier = B256;

/// Returns the SHA3-256 digest of `data` as an [`Identifier`].
pub fn sha3_256(data: impl AsRef<[u8]>) -> Identifier {
    Identifier::from_slice(&Sha3_256::digest(data.as_ref()))
}
