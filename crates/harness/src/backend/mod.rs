//! Ledger backends the harness submits to

use auto_impl::auto_impl;
use flow_emulator::{Blockchain, BlockchainError};
use flow_harness_primitives::{
    Address, Block, Identifier, ScriptResult, Transaction, TransactionResult,
};

mod network;
pub use network::{NetworkBackend, NetworkError};

/// Errors returned by a [`Backend`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Local emulator error.
    #[error(transparent)]
    Emulator(#[from] BlockchainError),
    /// Remote access node error.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// The operations the submission protocol needs from a ledger.
///
/// Calls are blocking. A backend runs one transaction at a time: `add_transaction` queues it,
/// `execute_next_transaction` produces its result and `commit_block` seals everything executed
/// so far.
#[auto_impl(&, Box, Arc)]
pub trait Backend {
    /// Id of the latest committed block.
    fn latest_block_id(&self) -> Result<Identifier, BackendError>;

    /// Queues a signed transaction.
    fn add_transaction(&self, tx: &Transaction) -> Result<(), BackendError>;

    /// Executes the oldest queued transaction.
    fn execute_next_transaction(&self) -> Result<TransactionResult, BackendError>;

    /// Runs a read-only script against the latest committed state.
    fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, BackendError>;

    /// Commits executed transactions into a new block.
    fn commit_block(&self) -> Result<Block, BackendError>;

    /// Current sequence number of an account key.
    fn sequence_number(&self, address: &Address, key_index: u32) -> Result<u64, BackendError>;
}

impl Backend for Blockchain {
    fn latest_block_id(&self) -> Result<Identifier, BackendError> {
        Ok(Self::latest_block_id(self))
    }

    fn add_transaction(&self, tx: &Transaction) -> Result<(), BackendError> {
        Ok(Self::add_transaction(self, tx)?)
    }

    fn execute_next_transaction(&self) -> Result<TransactionResult, BackendError> {
        Ok(Self::execute_next_transaction(self)?)
    }

    fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, BackendError> {
        Ok(Self::execute_script(self, script, arguments)?)
    }

    fn commit_block(&self) -> Result<Block, BackendError> {
        Ok(Self::commit_block(self)?)
    }

    fn sequence_number(&self, address: &Address, key_index: u32) -> Result<u64, BackendError> {
        let account = self.get_account(address)?;
        let key = account
            .key(key_index)
            .ok_or(BlockchainError::KeyNotFound { address: *address, key_index })?;
        Ok(key.sequence_number)
    }
}

/// The backend selected at bootstrap.
#[derive(Debug)]
pub enum LedgerBackend {
    /// In-process emulator.
    Emulator(Blockchain),
    /// Remote access node.
    Network(NetworkBackend),
}

impl LedgerBackend {
    /// Returns the emulator, if this is a local backend.
    pub fn as_emulator(&self) -> Option<&Blockchain> {
        match self {
            Self::Emulator(chain) => Some(chain),
            Self::Network(_) => None,
        }
    }

    /// Returns the remote client, if this is a network backend.
    pub fn as_network(&self) -> Option<&NetworkBackend> {
        match self {
            Self::Emulator(_) => None,
            Self::Network(client) => Some(client),
        }
    }

    /// Whether this is the in-process emulator.
    pub fn is_emulator(&self) -> bool {
        matches!(self, Self::Emulator(_))
    }
}

macro_rules! delegate {
    ($s:ident, $inner:ident => $e:expr) => {
        match $s {
            Self::Emulator($inner) => $e,
            Self::Network($inner) => $e,
        }
    };
}

impl Backend for LedgerBackend {
    fn latest_block_id(&self) -> Result<Identifier, BackendError> {
        delegate!(self, inner => Backend::latest_block_id(inner))
    }

    fn add_transaction(&self, tx: &Transaction) -> Result<(), BackendError> {
        delegate!(self, inner => Backend::add_transaction(inner, tx))
    }

    fn execute_next_transaction(&self) -> Result<TransactionResult, BackendError> {
        delegate!(self, inner => Backend::execute_next_transaction(inner))
    }

    fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptResult, BackendError> {
        delegate!(self, inner => Backend::execute_script(inner, script, arguments))
    }

    fn commit_block(&self) -> Result<Block, BackendError> {
        delegate!(self, inner => Backend::commit_block(inner))
    }

    fn sequence_number(&self, address: &Address, key_index: u32) -> Result<u64, BackendError> {
        delegate!(self, inner => Backend::sequence_number(inner, address, key_index))
    }
}
