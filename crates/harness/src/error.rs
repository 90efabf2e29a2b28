//! Harness error classes

use crate::backend::{BackendError, NetworkError};
use flow_harness_config::{EndpointError, ExtractConfigError};
use flow_harness_primitives::{
    Address, ExecutionError, Identifier, ParseFixedPointError, TransactionError,
    TransactionResult, Value,
};
use flow_harness_wallets::PrivateKeyError;
use std::{io, path::PathBuf};

/// Any failure reported by the harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The environment could not be set up.
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// A backend call in the submission protocol failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The backend answered, but not with the expected outcome.
    #[error(transparent)]
    Outcome(#[from] OutcomeMismatch),
}

impl HarnessError {
    /// Whether the error means the test environment itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_))
    }

    /// Returns the mismatched transaction result, if any.
    pub fn transaction_result(&self) -> Option<&TransactionResult> {
        match self {
            Self::Outcome(
                OutcomeMismatch::UnexpectedRevert { result }
                | OutcomeMismatch::UnexpectedSuccess { result },
            ) => Some(result),
            _ => None,
        }
    }
}

/// Failures while constructing the backend or loading fixtures.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The configuration could not be extracted.
    #[error(transparent)]
    Config(#[from] ExtractConfigError),
    /// The local emulator could not be created.
    #[error("failed to create emulator: {0}")]
    Emulator(#[source] flow_emulator::BlockchainError),
    /// The remote endpoint is missing or malformed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    /// The remote client could not be created.
    #[error("failed to connect to network: {0}")]
    Network(#[from] NetworkError),
    /// The service account key is unusable.
    #[error("invalid service account private key: {0}")]
    PrivateKey(#[from] PrivateKeyError),
    /// A configured key algorithm name is not recognised.
    #[error("unsupported service account key algorithm {0:?}")]
    UnsupportedKeyAlgorithm(String),
    /// Remote networks need an explicit service account key.
    #[error("FLOW_SERVICE_ACCOUNT_PRIVATE_KEY is required for network type {0}")]
    MissingServiceKey(String),
    /// A fixture file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        /// The fixture path.
        path: PathBuf,
        /// The io error.
        source: io::Error,
    },
    /// A fixed-point literal is malformed.
    #[error("invalid UFix64 literal {literal:?}: {source}")]
    InvalidFixedPoint {
        /// The rejected literal.
        literal: String,
        /// The parse error.
        source: ParseFixedPointError,
    },
}

/// Failures of the backend calls that make up a submission.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The latest block could not be fetched.
    #[error("failed to get latest block: {0}")]
    LatestBlock(#[source] BackendError),
    /// The signer lists passed to the signing protocol differ in length.
    #[error("got {addresses} signer addresses but {signers} signers")]
    SignerCountMismatch {
        /// Number of addresses.
        addresses: usize,
        /// Number of signers.
        signers: usize,
    },
    /// A signature could not be produced.
    #[error("failed to sign as {address}: {source}")]
    Signing {
        /// The signing address.
        address: Address,
        /// The signing error.
        source: TransactionError,
    },
    /// The backend did not accept the transaction.
    #[error("failed to add transaction: {0}")]
    SubmissionRejected(#[source] BackendError),
    /// The pending transaction could not be executed.
    #[error("failed to execute transaction: {0}")]
    Execution(#[source] BackendError),
    /// The script could not be executed.
    #[error("failed to execute script: {0}")]
    Script(#[source] BackendError),
    /// The block could not be committed.
    #[error("failed to commit block: {0}")]
    Commit(#[source] BackendError),
    /// A transaction succeeded without emitting an event it must emit.
    #[error("transaction {id} emitted no {event_type} event")]
    MissingEvent {
        /// The transaction.
        id: Identifier,
        /// The expected event type.
        event_type: &'static str,
    },
    /// A sequence number lookup failed.
    #[error("failed to get sequence number of {address}: {source}")]
    SequenceNumber {
        /// The account.
        address: Address,
        /// The backend error.
        source: BackendError,
    },
}

/// A result that contradicts the caller's expectation.
#[derive(Debug, thiserror::Error)]
pub enum OutcomeMismatch {
    /// The transaction was expected to succeed.
    #[error("transaction {} reverted: {}", .result.transaction_id, revert_reason(.result))]
    UnexpectedRevert {
        /// The committed result.
        result: TransactionResult,
    },
    /// The transaction was expected to revert.
    #[error("transaction {} succeeded but was expected to revert", .result.transaction_id)]
    UnexpectedSuccess {
        /// The committed result.
        result: TransactionResult,
    },
    /// The script reverted.
    #[error("script reverted: {error}")]
    ScriptReverted {
        /// The execution error.
        error: ExecutionError,
        /// Partial value, if the backend produced one.
        value: Option<Value>,
    },
}

fn revert_reason(result: &TransactionResult) -> String {
    result.error.as_ref().map(ToString::to_string).unwrap_or_default()
}
