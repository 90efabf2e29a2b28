//! Signature placement and key/address mismatches

use crate::emulator;
use flow_harness::{HarnessError, OutcomeMismatch, sign_transaction, submit};
use flow_harness_primitives::{ExecutionError, Transaction};
use flow_harness_wallets::{HashAlgorithm, LocalSigner};
use similar_asserts::assert_eq;

#[test]
fn first_signer_signs_envelope_others_sign_payload() {
    let harness = emulator();
    let alice_key = LocalSigner::random(HashAlgorithm::Sha3_256);
    let bob_key = LocalSigner::random(HashAlgorithm::Sha2_256);
    let alice = harness.create_account(&alice_key.account_key()).unwrap();
    let bob = harness.create_account(&bob_key.account_key()).unwrap();
    let service = harness.service.address;

    let mut tx =
        harness.service_transaction("noop").unwrap().with_authorizer(alice).with_authorizer(bob);
    let result = harness
        .sign_and_submit(
            &mut tx,
            &[service, alice, bob],
            &[&harness.service.signer, &alice_key, &bob_key],
            false,
        )
        .unwrap();
    assert!(result.succeeded());

    let envelope: Vec<_> = tx.envelope_signatures.iter().map(|sig| sig.address).collect();
    assert_eq!(envelope, vec![service]);

    let payload: Vec<_> = tx
        .payload_signatures
        .iter()
        .map(|sig| (sig.address, sig.signer_index, sig.key_index))
        .collect();
    assert_eq!(payload, vec![(alice, 1, 0), (bob, 2, 0)]);
}

#[test]
fn reference_block_is_latest_block() {
    let harness = emulator();
    let chain = harness.backend.as_emulator().unwrap();
    let service = harness.service.address;
    chain.commit_block().unwrap();
    let latest = chain.latest_block_id();

    let mut tx = harness.service_transaction("noop").unwrap();
    sign_transaction(&harness.backend, &mut tx, &[service], &[&harness.service.signer]).unwrap();
    assert_eq!(tx.reference_block_id, latest);
    assert_eq!(tx.envelope_signatures.len(), 1);
    assert!(tx.payload_signatures.is_empty());
}

#[test]
fn mismatched_key_reverts_at_execution() {
    let harness = emulator();
    let alice = harness
        .create_account(&LocalSigner::random(HashAlgorithm::Sha3_256).account_key())
        .unwrap();
    let impostor = LocalSigner::random(HashAlgorithm::Sha3_256);
    let service = harness.service.address;

    let mut tx = harness.service_transaction("noop").unwrap().with_authorizer(alice);

    // signing with a key the account does not hold is not checked up front
    sign_transaction(
        &harness.backend,
        &mut tx,
        &[service, alice],
        &[&harness.service.signer, &impostor],
    )
    .unwrap();
    assert_eq!(tx.payload_signatures.len(), 1);

    let result = submit(&harness.backend, &tx, true).unwrap();
    assert_eq!(result.error.unwrap().code, ExecutionError::INVALID_PAYLOAD_SIGNATURE);
}

#[test]
fn mismatched_key_without_expected_revert_is_an_outcome_mismatch() {
    let harness = emulator();
    let service = harness.service.address;
    let impostor = LocalSigner::random(HashAlgorithm::Sha3_256);
    let chain = harness.backend.as_emulator().unwrap();
    let height = chain.latest_block().height;

    let mut tx: Transaction = harness.service_transaction("noop").unwrap();
    let err = harness.sign_and_submit(&mut tx, &[service], &[&impostor], false).unwrap_err();
    let result = match err {
        HarnessError::Outcome(OutcomeMismatch::UnexpectedRevert { result }) => result,
        other => panic!("expected an unexpected revert, got {other:?}"),
    };
    assert_eq!(result.error.unwrap().code, ExecutionError::INVALID_ENVELOPE_SIGNATURE);
    assert_eq!(chain.latest_block().height, height + 1);
}
