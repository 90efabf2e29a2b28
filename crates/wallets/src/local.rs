use crate::{AccountKey, HashAlgorithm, PrivateKeyError, PublicKey, SignatureAlgorithm};
use alloy_primitives::{B256, hex::FromHex};
use flow_harness_primitives::{Signer, SignerError};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use std::fmt;

#[derive(Clone)]
enum SigningKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

/// An in-memory ECDSA private key on either supported curve.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    hash_algorithm: HashAlgorithm,
}

impl LocalSigner {
    /// Creates a signer from raw key bytes on the curve of `signature_algorithm`.
    pub fn from_bytes(
        bytes: &B256,
        signature_algorithm: SignatureAlgorithm,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self, PrivateKeyError> {
        let key = match signature_algorithm {
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::SigningKey::from_slice(bytes.as_slice())
                .map(SigningKey::P256),
            SignatureAlgorithm::EcdsaSecp256k1 => {
                k256::ecdsa::SigningKey::from_slice(bytes.as_slice()).map(SigningKey::Secp256k1)
            }
        }
        .map_err(PrivateKeyError::InvalidKey)?;
        Ok(Self { key, hash_algorithm })
    }

    /// Parses a hex private key, with or without `0x`.
    pub fn from_hex(
        private_key: &str,
        signature_algorithm: SignatureAlgorithm,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self, PrivateKeyError> {
        Self::from_bytes(&B256::from_hex(private_key)?, signature_algorithm, hash_algorithm)
    }

    /// Generates a fresh P-256 key.
    pub fn random(hash_algorithm: HashAlgorithm) -> Self {
        Self::random_with(SignatureAlgorithm::EcdsaP256, hash_algorithm)
    }

    /// Generates a fresh key on the curve of `signature_algorithm`.
    pub fn random_with(
        signature_algorithm: SignatureAlgorithm,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        let mut rng = rand_08::thread_rng();
        let key = match signature_algorithm {
            SignatureAlgorithm::EcdsaP256 => {
                SigningKey::P256(p256::ecdsa::SigningKey::random(&mut rng))
            }
            SignatureAlgorithm::EcdsaSecp256k1 => {
                SigningKey::Secp256k1(k256::ecdsa::SigningKey::random(&mut rng))
            }
        };
        Self { key, hash_algorithm }
    }

    /// Returns a signer for the same key with a different hash algorithm.
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    /// The hash applied before signing.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// The curve of this key.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self.key {
            SigningKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            SigningKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    /// The public half of this key.
    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            SigningKey::P256(key) => PublicKey::from(*key.verifying_key()),
            SigningKey::Secp256k1(key) => PublicKey::from(*key.verifying_key()),
        }
    }

    /// A full-weight account key matching this signer.
    pub fn account_key(&self) -> AccountKey {
        AccountKey::new(self.public_key(), self.hash_algorithm)
    }

    /// Raw private key bytes.
    pub fn to_bytes(&self) -> B256 {
        match &self.key {
            SigningKey::P256(key) => B256::from_slice(&key.to_bytes()),
            SigningKey::Secp256k1(key) => B256::from_slice(&key.to_bytes()),
        }
    }
}

impl Signer for LocalSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let digest = self.hash_algorithm.digest(message);
        match &self.key {
            SigningKey::P256(key) => {
                let signature: p256::ecdsa::Signature =
                    key.sign_prehash(&digest).map_err(SignerError::other)?;
                Ok(signature.to_bytes().to_vec())
            }
            SigningKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature =
                    key.sign_prehash(&digest).map_err(SignerError::other)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("public_key", &self.public_key())
            .field("signature_algorithm", &self.signature_algorithm())
            .field("hash_algorithm", &self.hash_algorithm)
            .finish_non_exhaustive()
    }
}
