//! Script execution against a bootstrapped emulator

use crate::{emulator, testdata};
use flow_harness::{HarnessError, OutcomeMismatch, bytes_to_array};
use flow_harness_primitives::{ExecutionError, Value};
use flow_emulator::EmulatorConfig;
use similar_asserts::assert_eq;

#[test]
fn service_account_balance() {
    let harness = emulator();
    let script = harness.read_template(testdata("scripts/get_balance.cdc")).unwrap();
    let balance = harness
        .execute_script_with_args_and_check(&script, &[Value::Address(harness.service.address)])
        .unwrap();
    assert_eq!(balance, Value::UFix64(EmulatorConfig::DEFAULT_SERVICE_BALANCE));
}

#[test]
fn core_contract_deployed_at_rendered_address() {
    let harness = emulator();
    let script = harness.read_template(testdata("scripts/get_contract_names.cdc")).unwrap();
    let names = harness.execute_script_and_check(&script).unwrap();
    assert_eq!(names, Value::Array(vec![Value::from("FlowToken")]));
}

#[test]
fn byte_array_round_trips_through_script() {
    let harness = emulator();
    let bytes = [0x00, 0xFF, 0x7A];
    let echoed =
        harness.execute_script_with_args_and_check(b"echo", &[bytes_to_array(&bytes)]).unwrap();
    assert_eq!(echoed.to_bytes().unwrap(), bytes.to_vec());
}

#[test]
fn reverted_script_is_an_outcome_mismatch() {
    let harness = emulator();
    let err = harness.execute_script_and_check(br#"revert "not allowed""#).unwrap_err();
    match err {
        HarnessError::Outcome(OutcomeMismatch::ScriptReverted { error, value }) => {
            assert_eq!(error, ExecutionError::runtime("not allowed"));
            assert_eq!(value, None);
        }
        other => panic!("expected a script revert, got {other:?}"),
    }
}

#[test]
fn unknown_account_reverts() {
    let harness = emulator();
    let missing = harness.chain.address_at(1_000);
    let err = harness
        .execute_script_with_args_and_check(b"balance", &[Value::Address(missing)])
        .unwrap_err();
    assert!(matches!(err, HarnessError::Outcome(OutcomeMismatch::ScriptReverted { .. })));
}
