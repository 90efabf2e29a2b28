//! Submission, commit and outcome checks

use crate::{emulator, testdata};
use flow_harness::{
    Backend, HarnessError, OutcomeMismatch, ProtocolError, sign_and_submit, submit, ufix64,
};
use flow_harness_primitives::{ExecutionError, Signer, Transaction, UFix64, Value};
use flow_harness_wallets::{HashAlgorithm, LocalSigner};
use similar_asserts::assert_eq;

#[test]
fn single_signer_succeeds_and_commits() -> eyre::Result<()> {
    let harness = emulator();
    let chain = harness.backend.as_emulator().unwrap();
    let before = chain.latest_block();

    let mut tx = harness.service_transaction("noop")?;
    let result = harness.submit_as_service(&mut tx, false)?;
    assert!(result.succeeded());

    let after = chain.latest_block();
    assert_eq!(after.height, before.height + 1);
    assert_eq!(after.parent_id, before.id);
    assert_eq!(after.transaction_ids, vec![result.transaction_id]);
    assert_eq!(chain.pending_transaction_count(), 0);
    Ok(())
}

#[test]
fn unsigned_transaction_reverts_and_commits() -> eyre::Result<()> {
    let harness = emulator();
    let before = harness.backend.latest_block_id()?;

    let mut tx = harness.service_transaction("noop")?;
    let signers: &[&dyn Signer] = &[];
    let result = sign_and_submit(&harness.backend, &mut tx, &[], signers, true)?;

    assert!(result.reverted());
    assert!(tx.payload_signatures.is_empty() && tx.envelope_signatures.is_empty());
    let chain = harness.backend.as_emulator().unwrap();
    assert_eq!(chain.latest_block().parent_id, before);
    assert_eq!(chain.latest_block().transaction_ids, vec![result.transaction_id]);
    Ok(())
}

#[test]
fn commit_after_revert_advances_latest_block() {
    let harness = emulator();
    let before = harness.backend.latest_block_id().unwrap();

    let mut tx = harness.service_transaction(r#"revert "out of tokens""#).unwrap();
    let err = harness.submit_as_service(&mut tx, false).unwrap_err();
    assert!(!err.is_fatal());

    let result = err.transaction_result().unwrap();
    assert_eq!(result.error.as_ref().unwrap().message, "out of tokens");
    assert_ne!(harness.backend.latest_block_id().unwrap(), before);
    assert!(err.to_string().contains("out of tokens"));
}

#[test]
fn unexpected_success_is_reported_after_commit() {
    let harness = emulator();
    let chain = harness.backend.as_emulator().unwrap();
    let height = chain.latest_block().height;

    let mut tx = harness.service_transaction("noop").unwrap();
    let err = harness.submit_as_service(&mut tx, true).unwrap_err();
    assert!(matches!(err, HarnessError::Outcome(OutcomeMismatch::UnexpectedSuccess { .. })));
    assert_eq!(chain.latest_block().height, height + 1);
}

#[test]
fn rejected_transaction_is_not_committed() {
    let harness = emulator();
    let chain = harness.backend.as_emulator().unwrap();
    let height = chain.latest_block().height;

    // an empty script is rejected before execution
    let mut tx = harness.service_transaction(Vec::new()).unwrap();
    let err = harness.submit_as_service(&mut tx, false).unwrap_err();
    assert!(matches!(err, HarnessError::Protocol(ProtocolError::SubmissionRejected(_))));
    assert_eq!(chain.latest_block().height, height);
}

#[test]
fn duplicate_submission_is_rejected() {
    let harness = emulator();
    let mut tx = harness.service_transaction("noop").unwrap();
    harness.submit_as_service(&mut tx, false).unwrap();

    let err = submit(&harness.backend, &tx, false).unwrap_err();
    assert!(matches!(err, HarnessError::Protocol(ProtocolError::SubmissionRejected(_))));
}

#[test]
fn service_sequence_number_advances() {
    let harness = emulator();
    let service = harness.service.address;
    for expected in 0..3 {
        let mut tx = harness.service_transaction("noop").unwrap();
        assert_eq!(tx.proposal_key.sequence_number, expected);
        harness.submit_as_service(&mut tx, false).unwrap();
    }
    assert_eq!(harness.backend.sequence_number(&service, 0).unwrap(), 3);
}

#[test]
fn stale_sequence_number_reverts() {
    let harness = emulator();
    let service = harness.service.address;
    let mut tx = Transaction::new()
        .with_script(&b"noop"[..])
        .with_proposal_key(service, 0, 42)
        .with_payer(service);
    let result = harness.submit_as_service(&mut tx, true).unwrap();
    assert_eq!(result.error.unwrap().code, ExecutionError::INVALID_PROPOSAL_SEQUENCE_NUMBER);
}

#[test]
fn tokens_move_between_accounts() -> eyre::Result<()> {
    let harness = emulator();
    let service = harness.service.address;
    let alice_key = LocalSigner::random(HashAlgorithm::Sha2_256);
    let alice = harness.create_account(&alice_key.account_key())?;
    let bob = harness.create_account(&LocalSigner::random(HashAlgorithm::Sha3_256).account_key())?;

    let mint = harness.read_template(testdata("transactions/mint_tokens.cdc"))?;
    let mut tx = harness
        .service_transaction(mint)?
        .with_argument(&ufix64("25.0")?)
        .with_argument(&Value::Address(alice))
        .with_authorizer(service);
    let result = harness.submit_as_service(&mut tx, false)?;
    assert_eq!(result.events_of("flow.TokensMinted").count(), 1);

    let transfer = harness.read_template(testdata("transactions/transfer_tokens.cdc"))?;
    let mut tx = harness
        .service_transaction(transfer.clone())?
        .with_argument(&ufix64("10.5")?)
        .with_argument(&Value::Address(bob))
        .with_authorizer(alice);
    let result = harness.sign_and_submit(
        &mut tx,
        &[service, alice],
        &[&harness.service.signer, &alice_key],
        false,
    )?;
    let event = result.events_of("flow.TokensTransferred").next().unwrap();
    assert_eq!(event.value.as_event().unwrap().field("from"), Some(&Value::Address(alice)));

    let balance = harness.read_template(testdata("scripts/get_balance.cdc"))?;
    let of = |address| {
        harness.execute_script_with_args_and_check(&balance, &[Value::Address(address)]).unwrap()
    };
    assert_eq!(of(alice), ufix64("14.5")?);
    assert_eq!(of(bob), ufix64("10.5")?);

    // overdrawing reverts and leaves balances untouched
    let mut tx = harness
        .service_transaction(transfer)?
        .with_argument(&ufix64("100.0")?)
        .with_argument(&Value::Address(bob))
        .with_authorizer(alice);
    harness.sign_and_submit(
        &mut tx,
        &[service, alice],
        &[&harness.service.signer, &alice_key],
        true,
    )?;
    assert_eq!(of(alice).as_ufix64(), Some(UFix64::from_raw(1_450_000_000)));
    Ok(())
}
