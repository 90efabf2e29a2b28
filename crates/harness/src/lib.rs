//! # flow-harness
//!
//! Builds, signs, submits and verifies transactions against an in-process emulator or a remote
//! access node, and runs read-only scripts with result assertions.
//!
//! ```no_run
//! use flow_harness::{Harness, HarnessError};
//!
//! # fn main() -> Result<(), HarnessError> {
//! let harness = Harness::from_env()?;
//! let script = harness.contracts.render("balance 0xFLOWTOKENADDRESS");
//! let balance = harness.execute_script_and_check(script.as_bytes())?;
//! # let _ = balance;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod backend;
pub use backend::{Backend, BackendError, LedgerBackend, NetworkBackend, NetworkError};

mod bootstrap;
pub use bootstrap::{Contracts, Harness, ServiceAccount, bootstrap};

pub mod error;
pub use error::{HarnessError, OutcomeMismatch, ProtocolError, SetupError};

pub mod protocol;
pub use protocol::{
    execute_script_and_check, execute_script_with_args_and_check, sign_and_submit,
    sign_transaction, submit,
};

pub mod utils;
pub use utils::{bytes_to_array, read_file, ufix64};

pub use flow_harness_config::{HarnessConfig, NetworkType};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
