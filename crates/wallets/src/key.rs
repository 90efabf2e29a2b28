use crate::WalletSignerError;
use alloy_primitives::hex;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Signature scheme of an account key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// ECDSA over NIST P-256, the default for new accounts.
    #[default]
    #[serde(rename = "ECDSA_P256")]
    EcdsaP256,
    /// ECDSA over secp256k1.
    #[serde(rename = "ECDSA_secp256k1")]
    EcdsaSecp256k1,
}

impl SignatureAlgorithm {
    /// Numeric code used on the wire.
    pub const fn code(self) -> u32 {
        match self {
            Self::EcdsaP256 => 2,
            Self::EcdsaSecp256k1 => 3,
        }
    }

    /// Name used in scripts and account key listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EcdsaP256 => "ECDSA_P256",
            Self::EcdsaSecp256k1 => "ECDSA_secp256k1",
        }
    }

    /// Looks up an algorithm by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ECDSA_P256" => Some(Self::EcdsaP256),
            "ECDSA_secp256k1" => Some(Self::EcdsaSecp256k1),
            _ => None,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hash applied to a message before it is signed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA2-256.
    #[serde(rename = "SHA2_256")]
    Sha2_256,
    /// SHA3-256.
    #[default]
    #[serde(rename = "SHA3_256")]
    Sha3_256,
}

impl HashAlgorithm {
    /// Numeric code used on the wire.
    pub const fn code(self) -> u32 {
        match self {
            Self::Sha2_256 => 1,
            Self::Sha3_256 => 3,
        }
    }

    /// Name used in scripts and account key listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha2_256 => "SHA2_256",
            Self::Sha3_256 => "SHA3_256",
        }
    }

    /// Looks up an algorithm by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHA2_256" => Some(Self::Sha2_256),
            "SHA3_256" => Some(Self::Sha3_256),
            _ => None,
        }
    }

    /// Looks up an algorithm by its wire code.
    pub fn from_code(code: u32) -> Result<Self, WalletSignerError> {
        match code {
            1 => Ok(Self::Sha2_256),
            3 => Ok(Self::Sha3_256),
            other => Err(WalletSignerError::UnsupportedHashAlgorithm(other)),
        }
    }

    /// Hashes `message`.
    pub fn digest(self, message: &[u8]) -> [u8; 32] {
        match self {
            Self::Sha2_256 => Sha256::digest(message).into(),
            Self::Sha3_256 => Sha3_256::digest(message).into(),
        }
    }
}

/// An uncompressed ECDSA public key, encoded as the 64 byte `x || y` form without a SEC1 tag.
#[derive(Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// A NIST P-256 key.
    P256(p256::ecdsa::VerifyingKey),
    /// A secp256k1 key.
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Length of the encoded key.
    pub const LENGTH: usize = 64;

    /// Parses a 64 byte `x || y` encoding on the curve of `algorithm`.
    pub fn from_slice(
        bytes: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> Result<Self, WalletSignerError> {
        if bytes.len() != Self::LENGTH {
            return Err(WalletSignerError::InvalidPublicKeyLength(bytes.len()));
        }
        let mut sec1 = [0u8; Self::LENGTH + 1];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(bytes);
        Ok(match algorithm {
            SignatureAlgorithm::EcdsaP256 => {
                Self::P256(p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)?)
            }
            SignatureAlgorithm::EcdsaSecp256k1 => {
                Self::Secp256k1(k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)?)
            }
        })
    }

    /// Parses a hex encoding, with or without `0x`.
    pub fn from_hex(s: &str, algorithm: SignatureAlgorithm) -> Result<Self, WalletSignerError> {
        Self::from_slice(&hex::decode(s)?, algorithm)
    }

    /// The curve this key lives on.
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::P256(_) => SignatureAlgorithm::EcdsaP256,
            Self::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    /// Returns the 64 byte `x || y` encoding.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let mut bytes = [0u8; Self::LENGTH];
        match self {
            Self::P256(key) => bytes.copy_from_slice(&key.to_encoded_point(false).as_bytes()[1..]),
            Self::Secp256k1(key) => {
                bytes.copy_from_slice(&key.to_encoded_point(false).as_bytes()[1..])
            }
        }
        bytes
    }

    /// Hex encoding without prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Returns `true` if `signature` is a valid `r || s` signature of `message` hashed with `hash`.
    pub fn verify(&self, message: &[u8], signature: &[u8], hash: HashAlgorithm) -> bool {
        let digest = hash.digest(message);
        match self {
            Self::P256(key) => p256::ecdsa::Signature::from_slice(signature)
                .is_ok_and(|signature| key.verify_prehash(&digest, &signature).is_ok()),
            Self::Secp256k1(key) => k256::ecdsa::Signature::from_slice(signature)
                .is_ok_and(|signature| key.verify_prehash(&digest, &signature).is_ok()),
        }
    }
}

impl From<p256::ecdsa::VerifyingKey> for PublicKey {
    fn from(key: p256::ecdsa::VerifyingKey) -> Self {
        Self::P256(key)
    }
}

impl From<k256::ecdsa::VerifyingKey> for PublicKey {
    fn from(key: k256::ecdsa::VerifyingKey) -> Self {
        Self::Secp256k1(key)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.algorithm()).field(&self.hex()).finish()
    }
}

/// A key registered on an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountKey {
    /// Position of the key on its account.
    pub index: u32,
    /// The public key.
    pub public_key: PublicKey,
    /// Signature scheme.
    pub signature_algorithm: SignatureAlgorithm,
    /// Hash applied before signing.
    pub hash_algorithm: HashAlgorithm,
    /// Voting weight, out of [`AccountKey::FULL_WEIGHT`].
    pub weight: u32,
    /// Number of transactions this key has proposed.
    pub sequence_number: u64,
    /// Revoked keys never satisfy a signature check.
    pub revoked: bool,
}

impl AccountKey {
    /// Weight required to authorize on behalf of an account.
    pub const FULL_WEIGHT: u32 = 1000;

    /// A full-weight key at index zero, on the curve of `public_key`.
    pub fn new(public_key: PublicKey, hash_algorithm: HashAlgorithm) -> Self {
        Self {
            index: 0,
            signature_algorithm: public_key.algorithm(),
            public_key,
            hash_algorithm,
            weight: Self::FULL_WEIGHT,
            sequence_number: 0,
            revoked: false,
        }
    }

    /// Sets the key weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Verifies `signature` over `message` with this key's hash algorithm.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        if self.revoked {
            trace!(target: "wallets", index = self.index, "rejecting signature from revoked key");
            return false;
        }
        self.public_key.verify(message, signature, self.hash_algorithm)
    }
}
