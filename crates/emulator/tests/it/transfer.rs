//! Multi-party transactions through the builtin runtime

use flow_emulator::{Blockchain, EmulatorConfig};
use flow_harness_primitives::{Address, Transaction, UFix64, Value};
use flow_harness_wallets::{HashAlgorithm, LocalSigner};
use similar_asserts::assert_eq;

fn sequence_number(chain: &Blockchain, address: &Address) -> u64 {
    chain.get_account(address).unwrap().keys[0].sequence_number
}

#[test]
fn authorizer_signs_payload_and_service_pays() {
    let chain = Blockchain::new(EmulatorConfig::test()).unwrap();
    let service = chain.service_address();
    let alice_key = LocalSigner::random(HashAlgorithm::Sha2_256);
    let alice = chain.create_account(&[alice_key.account_key()]).unwrap();

    // fund alice
    let mut mint = Transaction::new()
        .with_script(format!("mint 10.0 {alice}").into_bytes())
        .with_proposal_key(service, 0, sequence_number(&chain, &service))
        .with_payer(service)
        .with_authorizer(service)
        .with_reference_block_id(chain.latest_block_id());
    mint.sign_envelope(service, 0, chain.service_signer()).unwrap();
    chain.add_transaction(&mint).unwrap();
    let (_, results) = chain.execute_and_commit_block().unwrap();
    assert!(results[0].succeeded(), "{:?}", results[0].error);

    // alice sends 4 back to the service account
    let mut transfer = Transaction::new()
        .with_script(b"transfer".to_vec())
        .with_argument(&Value::UFix64("4.0".parse().unwrap()))
        .with_argument(&Value::Address(service))
        .with_proposal_key(service, 0, sequence_number(&chain, &service))
        .with_payer(service)
        .with_authorizer(alice)
        .with_reference_block_id(chain.latest_block_id());
    transfer.sign_payload(alice, 0, &alice_key).unwrap();
    transfer.sign_envelope(service, 0, chain.service_signer()).unwrap();
    chain.add_transaction(&transfer).unwrap();
    let result = chain.execute_next_transaction().unwrap();
    chain.commit_block().unwrap();

    assert!(result.succeeded(), "{:?}", result.error);
    assert_eq!(chain.get_account(&alice).unwrap().balance, UFix64::from_integer(6).unwrap());
    let event = result.events_of("flow.TokensTransferred").next().unwrap();
    assert_eq!(event.value.as_event().unwrap().field("to"), Some(&Value::Address(service)));
}

#[test]
fn missing_authorizer_signature_reverts() {
    let chain = Blockchain::new(EmulatorConfig::test()).unwrap();
    let service = chain.service_address();
    let alice_key = LocalSigner::random(HashAlgorithm::Sha3_256).account_key();
    let alice = chain.create_account(&[alice_key]).unwrap();

    let mut tx = Transaction::new()
        .with_script(b"noop".to_vec())
        .with_proposal_key(service, 0, sequence_number(&chain, &service))
        .with_payer(service)
        .with_authorizer(alice)
        .with_reference_block_id(chain.latest_block_id());
    tx.sign_envelope(service, 0, chain.service_signer()).unwrap();
    chain.add_transaction(&tx).unwrap();

    let result = chain.execute_next_transaction().unwrap();
    assert_eq!(result.error.unwrap().code, 1055);
}
