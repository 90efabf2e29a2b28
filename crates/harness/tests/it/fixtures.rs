//! Fixture files and templates

use crate::emulator;
use flow_harness::{SetupError, read_file};

#[test]
fn renders_template_from_disk() {
    let harness = emulator();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imports.cdc");
    std::fs::write(
        &path,
        "import FungibleToken from 0xFUNGIBLETOKENADDRESS\n\
         import FlowFees from 0xFLOWFEESADDRESS\n",
    )
    .unwrap();

    let rendered = String::from_utf8(harness.read_template(&path).unwrap()).unwrap();
    assert_eq!(
        rendered,
        format!(
            "import FungibleToken from {}\nimport FlowFees from {}\n",
            harness.contracts.fungible_token, harness.contracts.fees
        )
    );

    // the raw file is left untouched
    assert!(String::from_utf8(read_file(&path).unwrap()).unwrap().contains("0xFLOWFEESADDRESS"));
}

#[test]
fn missing_fixture_is_fatal() {
    let harness = emulator();
    let dir = tempfile::tempdir().unwrap();
    let err = harness.read_template(dir.path().join("missing.cdc")).unwrap_err();
    assert!(matches!(err, SetupError::ReadFile { .. }));
}
