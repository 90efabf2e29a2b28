use crate::{HashAlgorithm, LocalSigner, SignatureAlgorithm, error::PrivateKeyError};
use alloy_primitives::{B256, hex::FromHex};

/// Private key of the emulator's service account when none is configured.
pub const DEFAULT_SERVICE_PRIVATE_KEY: &str =
    "4d9287571c8bff7482ffc27ef68d5b4990f9bd009a1e9fa812aae08ba167d57f";

fn ensure_pk_not_env(pk: &str) -> Result<(), PrivateKeyError> {
    if !pk.starts_with("0x") && std::env::var(pk).is_ok() {
        return Err(PrivateKeyError::ExistsAsEnvVar(pk.to_string()));
    }
    Ok(())
}

/// Validates and sanitizes user input, returning a configured [LocalSigner].
///
/// Keys are expected to be P-256 keys signing with [`HashAlgorithm::Sha3_256`], the defaults for
/// new accounts.
pub fn create_private_key_signer(private_key_str: &str) -> Result<LocalSigner, PrivateKeyError> {
    create_private_key_signer_with(
        private_key_str,
        SignatureAlgorithm::default(),
        HashAlgorithm::default(),
    )
}

/// Like [`create_private_key_signer`] for a key with explicit algorithms.
pub fn create_private_key_signer_with(
    private_key_str: &str,
    signature_algorithm: SignatureAlgorithm,
    hash_algorithm: HashAlgorithm,
) -> Result<LocalSigner, PrivateKeyError> {
    let private_key_str = private_key_str.trim();
    let private_key = match B256::from_hex(private_key_str) {
        Ok(private_key) => private_key,
        Err(err) => {
            ensure_pk_not_env(private_key_str)?;
            return Err(err.into());
        }
    };
    LocalSigner::from_bytes(&private_key, signature_algorithm, hash_algorithm).inspect_err(|_| {
        debug!(target: "wallets", %signature_algorithm, "private key is not a valid scalar");
    })
}

/// The deterministic service account signer used by local emulators.
pub fn default_service_signer() -> Result<LocalSigner, PrivateKeyError> {
    create_private_key_signer(DEFAULT_SERVICE_PRIVATE_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_private_key_signer() {
        let pk = LocalSigner::random(HashAlgorithm::Sha3_256).to_bytes();
        let pk_str = pk.to_string();
        assert!(create_private_key_signer(&pk_str).is_ok());
        // skip 0x
        assert!(create_private_key_signer(&pk_str[2..]).is_ok());
    }

    #[test]
    fn rejects_invalid_hex() {
        assert!(matches!(
            create_private_key_signer("0xnothex"),
            Err(PrivateKeyError::InvalidHex(_))
        ));
    }

    #[test]
    fn default_service_signer_is_stable() {
        let a = default_service_signer().unwrap();
        let b = default_service_signer().unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.hash_algorithm(), HashAlgorithm::Sha3_256);
        assert_eq!(a.signature_algorithm(), SignatureAlgorithm::EcdsaP256);
    }

    #[test]
    fn explicit_curve_changes_the_key() {
        let p256 = create_private_key_signer(DEFAULT_SERVICE_PRIVATE_KEY).unwrap();
        let k256 = create_private_key_signer_with(
            DEFAULT_SERVICE_PRIVATE_KEY,
            SignatureAlgorithm::EcdsaSecp256k1,
            HashAlgorithm::Sha2_256,
        )
        .unwrap();
        assert_eq!(k256.signature_algorithm(), SignatureAlgorithm::EcdsaSecp256k1);
        assert_eq!(k256.hash_algorithm(), HashAlgorithm::Sha2_256);
        assert_eq!(k256.to_bytes(), p256.to_bytes());
        assert_ne!(k256.public_key().to_bytes(), p256.public_key().to_bytes());
    }
}
