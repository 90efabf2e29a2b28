mod config;
mod fixtures;
mod script;
mod signing;
mod submit;

use flow_harness::{Harness, HarnessConfig, bootstrap};
use std::path::PathBuf;

/// A fresh emulator-backed harness.
pub(crate) fn emulator() -> Harness {
    flow_harness::init_tracing();
    bootstrap(&HarnessConfig::default()).unwrap()
}

pub(crate) fn testdata(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(path)
}

fn main() {}
