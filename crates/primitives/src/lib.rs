//! Ledger primitives shared by the emulator, the remote client and the test harness.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod address;
mod block;
mod identifier;
mod result;
mod signer;
mod transaction;
mod ufix64;
mod value;

pub use address::*;
pub use block::*;
pub use identifier::*;
pub use result::*;
pub use signer::*;
pub use transaction::*;
pub use ufix64::*;
pub use value::*;

// reexport for convenience
pub use alloy_primitives::{Bytes, hex};
