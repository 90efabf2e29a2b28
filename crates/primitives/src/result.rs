use crate::{Identifier, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error raised while executing a transaction or script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Numeric error code.
    pub code: u16,
    /// Human readable description.
    pub message: String,
}

impl ExecutionError {
    /// The proposal key signature is missing or invalid.
    pub const INVALID_PROPOSAL_SIGNATURE: u16 = 1006;
    /// The proposal key sequence number does not match the ledger.
    pub const INVALID_PROPOSAL_SEQUENCE_NUMBER: u16 = 1007;
    /// A payload signature is invalid.
    pub const INVALID_PAYLOAD_SIGNATURE: u16 = 1008;
    /// An envelope signature is invalid or missing.
    pub const INVALID_ENVELOPE_SIGNATURE: u16 = 1009;
    /// An authorizer did not provide enough key weight.
    pub const ACCOUNT_AUTHORIZATION: u16 = 1055;
    /// The script aborted.
    pub const RUNTIME: u16 = 1101;

    /// Creates a new error.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Creates a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(Self::RUNTIME, message)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Error Code: {}] {}", self.code, self.message)
    }
}

impl std::error::Error for ExecutionError {}

/// An event emitted by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Fully qualified event type, e.g. `flow.AccountCreated`.
    pub event_type: String,
    /// Transaction that emitted the event.
    pub transaction_id: Identifier,
    /// Position of the transaction in its block.
    pub transaction_index: u32,
    /// Position of the event within the transaction.
    pub event_index: u32,
    /// Decoded payload.
    pub value: Value,
}

/// Outcome of executing a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// The executed transaction.
    pub transaction_id: Identifier,
    /// Set if execution reverted.
    pub error: Option<ExecutionError>,
    /// Events emitted, empty when reverted.
    pub events: Vec<Event>,
    /// Log lines produced by the script.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl TransactionResult {
    /// Creates a successful result.
    pub fn success(transaction_id: Identifier, events: Vec<Event>) -> Self {
        Self { transaction_id, error: None, events, logs: Vec::new() }
    }

    /// Creates a reverted result.
    pub fn reverted_with(transaction_id: Identifier, error: ExecutionError) -> Self {
        Self { transaction_id, error: Some(error), events: Vec::new(), logs: Vec::new() }
    }

    /// Returns `true` if execution completed without error.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` if execution failed.
    pub fn reverted(&self) -> bool {
        self.error.is_some()
    }

    /// Events of the given type, in emission order.
    pub fn events_of<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |event| event.event_type == event_type)
    }
}

/// Outcome of executing a read-only script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptResult {
    /// Returned value, if any was produced.
    pub value: Option<Value>,
    /// Set if the script failed.
    pub error: Option<ExecutionError>,
    /// Log lines produced by the script.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl ScriptResult {
    /// Creates a successful result.
    pub fn success(value: Value) -> Self {
        Self { value: Some(value), error: None, logs: Vec::new() }
    }

    /// Creates a failed result.
    pub fn failure(error: ExecutionError) -> Self {
        Self { value: None, error: Some(error), logs: Vec::new() }
    }

    /// Returns `true` if the script completed without error.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` if the script failed.
    pub fn reverted(&self) -> bool {
        self.error.is_some()
    }
}
