//! Signing, submission and verification of transactions and scripts.
//!
//! The submission protocol always commits a block after executing a transaction, whether or not
//! the outcome matched the expectation, so the backend never keeps an executed but uncommitted
//! transaction around.

use crate::{
    backend::Backend,
    error::{HarnessError, OutcomeMismatch, ProtocolError},
};
use flow_harness_primitives::{Address, Signer, Transaction, TransactionResult, Value};

/// Anchors `tx` to the latest block and applies one signature per signer.
///
/// Signers are applied in reverse order: the signer at index 0 signs the envelope, all others
/// sign the payload, each with key index 0 of the paired address. Nothing checks that a signer
/// actually holds a key of its address; a mismatch surfaces as a revert on execution.
pub fn sign_transaction<B, S>(
    backend: &B,
    tx: &mut Transaction,
    signer_addresses: &[Address],
    signers: &[S],
) -> Result<(), HarnessError>
where
    B: Backend + ?Sized,
    S: Signer,
{
    if signer_addresses.len() != signers.len() {
        return Err(ProtocolError::SignerCountMismatch {
            addresses: signer_addresses.len(),
            signers: signers.len(),
        }
        .into());
    }

    let reference_block_id = backend.latest_block_id().map_err(ProtocolError::LatestBlock)?;
    tx.set_reference_block_id(reference_block_id);

    for (index, (address, signer)) in signer_addresses.iter().zip(signers).enumerate().rev() {
        let signed = if index == 0 {
            tx.sign_envelope(*address, 0, signer)
        } else {
            tx.sign_payload(*address, 0, signer)
        };
        signed.map_err(|source| ProtocolError::Signing { address: *address, source })?;
        trace!(
            target: "harness::protocol",
            %address,
            envelope = index == 0,
            "signed transaction"
        );
    }
    Ok(())
}

/// Signs `tx` with [`sign_transaction`] and [`submit`]s it.
pub fn sign_and_submit<B, S>(
    backend: &B,
    tx: &mut Transaction,
    signer_addresses: &[Address],
    signers: &[S],
    should_revert: bool,
) -> Result<TransactionResult, HarnessError>
where
    B: Backend + ?Sized,
    S: Signer,
{
    sign_transaction(backend, tx, signer_addresses, signers)?;
    submit(backend, tx, should_revert)
}

/// Adds `tx`, executes it and commits a block.
///
/// The block is committed even when the result contradicts `should_revert`; the mismatch is
/// returned only once the commit succeeded.
pub fn submit<B>(
    backend: &B,
    tx: &Transaction,
    should_revert: bool,
) -> Result<TransactionResult, HarnessError>
where
    B: Backend + ?Sized,
{
    backend.add_transaction(tx).map_err(ProtocolError::SubmissionRejected)?;
    let result = backend.execute_next_transaction().map_err(ProtocolError::Execution)?;
    debug!(
        target: "harness::protocol",
        id = %result.transaction_id,
        reverted = result.reverted(),
        "executed transaction"
    );

    let mismatch = match (should_revert, &result.error) {
        (true, None) => Some(OutcomeMismatch::UnexpectedSuccess { result: result.clone() }),
        (false, Some(error)) => {
            error!(
                target: "harness::protocol",
                id = %result.transaction_id,
                %error,
                "transaction reverted"
            );
            Some(OutcomeMismatch::UnexpectedRevert { result: result.clone() })
        }
        _ => None,
    };

    let block = backend.commit_block().map_err(ProtocolError::Commit)?;
    trace!(target: "harness::protocol", height = block.height, id = %block.id, "committed block");

    match mismatch {
        Some(mismatch) => Err(mismatch.into()),
        None => Ok(result),
    }
}

/// Executes a script without arguments and returns its value.
pub fn execute_script_and_check<B>(backend: &B, script: &[u8]) -> Result<Value, HarnessError>
where
    B: Backend + ?Sized,
{
    execute_script_with_args_and_check(backend, script, &[])
}

/// Executes a script with encoded `arguments` and returns its value.
pub fn execute_script_with_args_and_check<B>(
    backend: &B,
    script: &[u8],
    arguments: &[Value],
) -> Result<Value, HarnessError>
where
    B: Backend + ?Sized,
{
    let arguments: Vec<Vec<u8>> = arguments.iter().map(Value::encode).collect();
    let result = backend.execute_script(script, &arguments).map_err(ProtocolError::Script)?;
    match result.error {
        Some(error) => {
            error!(target: "harness::protocol", %error, "script reverted");
            Err(OutcomeMismatch::ScriptReverted { error, value: result.value }.into())
        }
        None => Ok(result.value.unwrap_or_default()),
    }
}
