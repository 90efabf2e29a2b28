//! Custom runtimes plugged into the emulator

use flow_emulator::{
    Blockchain, EmulatorConfig, Ledger, Runtime,
    runtime::{Invocation, Output},
};
use flow_harness_primitives::{Composite, ExecutionError, Transaction, Value};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Counts invocations and echoes the script back as an event.
#[derive(Default)]
struct CountingRuntime {
    calls: AtomicUsize,
}

impl Runtime for CountingRuntime {
    fn execute_transaction(
        &self,
        invocation: &Invocation<'_>,
        _ledger: &mut Ledger,
    ) -> Result<Output, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = String::from_utf8_lossy(invocation.script).into_owned();
        Ok(Output {
            events: vec![Composite::new(
                "test.Executed",
                vec![("script".to_string(), Value::String(script))],
            )],
            logs: vec!["executed".to_string()],
        })
    }

    fn execute_script(
        &self,
        _invocation: &Invocation<'_>,
        _ledger: &Ledger,
    ) -> Result<Value, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::UInt64(self.calls.load(Ordering::SeqCst) as u64))
    }
}

#[test]
fn custom_runtime_receives_transactions() {
    crate::init_tracing();
    let runtime = Arc::new(CountingRuntime::default());
    let chain = Blockchain::new(EmulatorConfig::test()).unwrap().with_runtime(Arc::clone(&runtime));
    let service = chain.service_address();

    let mut tx = Transaction::new()
        .with_script(b"anything goes".to_vec())
        .with_proposal_key(service, 0, 0)
        .with_payer(service)
        .with_reference_block_id(chain.latest_block_id());
    tx.sign_envelope(service, 0, chain.service_signer()).unwrap();

    chain.add_transaction(&tx).unwrap();
    let result = chain.execute_next_transaction().unwrap();
    assert!(result.succeeded());
    assert_eq!(result.logs, vec!["executed".to_string()]);
    assert_eq!(result.events[0].event_type, "test.Executed");
    assert_eq!(result.events[0].transaction_id, tx.id());

    let value = chain.execute_script(b"", &[]).unwrap().value;
    assert_eq!(value, Some(Value::UInt64(2)));
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn signature_checks_run_before_runtime() {
    let runtime = Arc::new(CountingRuntime::default());
    let chain = Blockchain::new(EmulatorConfig::test()).unwrap().with_runtime(Arc::clone(&runtime));
    let service = chain.service_address();

    let tx = Transaction::new()
        .with_script(b"unsigned".to_vec())
        .with_proposal_key(service, 0, 0)
        .with_payer(service)
        .with_reference_block_id(chain.latest_block_id());
    chain.add_transaction(&tx).unwrap();

    assert!(chain.execute_next_transaction().unwrap().reverted());
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
}
