//! Emulator errors

use flow_harness_primitives::{Address, Identifier, TransactionError};
use flow_harness_wallets::PrivateKeyError;

/// Errors returned by [`Blockchain`](crate::Blockchain) operations.
///
/// These are failures of the call itself. A transaction that runs and fails is reported
/// through the error of its result instead.
#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    /// The transaction was rejected before entering the pending block.
    #[error(transparent)]
    InvalidTransaction(#[from] InvalidTransactionError),
    /// Nothing is waiting to be executed.
    #[error("pending block has no transactions left to execute")]
    NoPendingTransaction,
    /// The pending block still holds transactions that have not been executed.
    #[error("pending block has {0} unexecuted transactions")]
    PendingTransactions(usize),
    /// No block at this height.
    #[error("block with height {0} not found")]
    BlockNotFound(u64),
    /// No executed transaction with this id.
    #[error("transaction result {0} not found")]
    TransactionResultNotFound(Identifier),
    /// No account at this address.
    #[error("account {0} not found")]
    AccountNotFound(Address),
    /// The account has no key at this index.
    #[error("account {address} has no key with index {key_index}")]
    KeyNotFound {
        /// The account.
        address: Address,
        /// The requested key index.
        key_index: u32,
    },
    /// The service key could not be loaded.
    #[error(transparent)]
    ServiceKey(#[from] PrivateKeyError),
    /// An account must be created with at least one key.
    #[error("an account needs at least one key")]
    MissingAccountKey,
    /// Signing a service account transaction failed.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// A convenience operation submitted a transaction that reverted.
    #[error("transaction {id} reverted: {message}")]
    Reverted {
        /// The reverted transaction.
        id: Identifier,
        /// The execution error.
        message: String,
    },
}

/// Structural reasons for rejecting a submitted transaction.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransactionError {
    /// The script is empty.
    #[error("transaction script is empty")]
    EmptyScript,
    /// The payer is unset.
    #[error("transaction is missing a payer")]
    MissingPayer,
    /// The proposal key address is unset.
    #[error("transaction is missing a proposal key")]
    MissingProposer,
    /// The requested gas limit is above the configured maximum.
    #[error("transaction gas limit {actual} exceeds the maximum of {maximum}")]
    GasLimitExceeded {
        /// Requested limit.
        actual: u64,
        /// Largest accepted limit.
        maximum: u64,
    },
    /// The reference block is not part of the chain.
    #[error("reference block {0} does not exist")]
    UnknownReferenceBlock(Identifier),
    /// The reference block is too old.
    #[error(
        "transaction expired: reference block height {reference_height}, \
         latest height {latest_height}"
    )]
    Expired {
        /// Height of the reference block.
        reference_height: u64,
        /// Height of the latest sealed block.
        latest_height: u64,
    },
    /// The same transaction was submitted before.
    #[error("transaction {0} has already been submitted")]
    Duplicate(Identifier),
}
