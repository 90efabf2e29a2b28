//! # flow-harness-wallets
//!
//! Signing keys for ledger accounts, on NIST P-256 or secp256k1.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod error;
pub use error::{PrivateKeyError, WalletSignerError};

mod key;
pub use key::{AccountKey, HashAlgorithm, PublicKey, SignatureAlgorithm};

mod local;
pub use local::LocalSigner;

pub mod utils;
pub use utils::{create_private_key_signer, create_private_key_signer_with, default_service_signer};
