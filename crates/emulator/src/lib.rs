//! # flow-emulator
//!
//! An in-process ledger that accepts signed transactions, verifies their signatures, runs them
//! through a [`Runtime`] and seals the results into blocks.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod blockchain;
pub use blockchain::Blockchain;

mod config;
pub use config::EmulatorConfig;

pub mod error;
pub use error::{BlockchainError, InvalidTransactionError};

mod genesis;
pub use genesis::{GenesisConfig, GenesisContracts};

mod ledger;
pub use ledger::{Account, Ledger};

pub mod runtime;
pub use runtime::{BuiltinRuntime, Runtime};
